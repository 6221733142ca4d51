//! Identity keys for scheduled timer objects.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::sync::Arc;
use core::ops::Deref;

mod sealed {
    pub trait Sealed {}
}

/// Pointer-like handle whose target keeps one address for as long as the
/// handle lives, wherever the handle itself is moved.
///
/// Implemented for `Rc<T>`, `Arc<T>`, `Box<T>` and `&T` only. Wrappers that
/// store the value inline would key objects by the wrapper's own, moving
/// address, so they are not accepted.
///
/// Zero-sized values behind `Box` or plain references do not get their own
/// allocation and may share an address; schedule them through `Rc`/`Arc`
/// instead.
pub trait TimerHandle: Deref + sealed::Sealed {}

impl<T: ?Sized> sealed::Sealed for Rc<T> {}
impl<T: ?Sized> TimerHandle for Rc<T> {}

impl<T: ?Sized> sealed::Sealed for Arc<T> {}
impl<T: ?Sized> TimerHandle for Arc<T> {}

impl<T: ?Sized> sealed::Sealed for Box<T> {}
impl<T: ?Sized> TimerHandle for Box<T> {}

impl<T: ?Sized> sealed::Sealed for &T {}
impl<T: ?Sized> TimerHandle for &T {}

/// Identity of a scheduled object.
///
/// Two handles share a key exactly when they point at the same value, so
/// clones of one `Rc`/`Arc` are the same timer while equal values in
/// separate allocations are not.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimerKey(usize);

impl TimerKey {
    /// Returns the key of the value behind `handle`.
    #[must_use]
    pub fn of<P: TimerHandle>(handle: &P) -> Self {
        let target: *const P::Target = &**handle;
        Self(target.cast::<()>() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::TimerKey;
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::sync::Arc;

    #[test]
    fn clones_share_identity() {
        let a = Rc::new(7_u32);
        let b = Rc::clone(&a);
        assert_eq!(TimerKey::of(&a), TimerKey::of(&b));

        let c = Arc::new(7_u32);
        let d = Arc::clone(&c);
        assert_eq!(TimerKey::of(&c), TimerKey::of(&d));
    }

    #[test]
    fn equal_values_keep_distinct_identity() {
        let a = Box::new(7_u32);
        let b = Box::new(7_u32);
        assert_eq!(*a, *b);
        assert_ne!(TimerKey::of(&a), TimerKey::of(&b));
    }

    #[test]
    fn key_survives_moving_the_handle() {
        let boxed = Box::new(3_u64);
        let before = TimerKey::of(&boxed);
        let moved = [boxed];
        assert_eq!(TimerKey::of(&moved[0]), before);
    }

    #[test]
    fn reference_and_rc_agree_on_pointee() {
        let a = Rc::new([1_u8, 2, 3]);
        let r: &[u8; 3] = &a;
        assert_eq!(TimerKey::of(&a), TimerKey::of(&r));
    }

    #[test]
    fn zero_sized_values_in_rc_stay_distinct() {
        struct Tick;
        let a = Rc::new(Tick);
        let b = Rc::new(Tick);
        assert_ne!(TimerKey::of(&a), TimerKey::of(&b));
    }
}
