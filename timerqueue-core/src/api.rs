/// Returns a stable string printed by the simulator at startup.
#[must_use]
pub fn bootstrap_signature() -> &'static str {
    "timerqueue-rust-bootstrap"
}
