//! Idle-timeout simulation built on the timer queue.
//!
//! Every session owns one idle deadline. Activity pushes the deadline out,
//! a small share of activity closes the session instead, and sessions whose
//! deadline passes either expire or, in keepalive mode, rearm themselves
//! from inside the notification.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use timerqueue_core::runtime::timers::wait::{next_wait_msec, EMPTY_WAIT_MSEC};
use timerqueue_core::{FireContext, TimerHandle, TimerObject, TimerQueue, TimerQueueStats};

/// Queue type driven by the simulator.
pub type SessionQueue = TimerQueue<Arc<Session>, Duration>;

/// Validated simulation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub sessions: usize,
    pub timeout: Duration,
    pub tick: Duration,
    pub duration: Duration,
    pub touches_per_tick: u32,
    pub close_ratio: f64,
    pub keepalive: bool,
    pub realtime: bool,
    pub seed: u64,
}

/// One simulated client session.
#[derive(Debug)]
pub struct Session {
    id: usize,
    timeout: Duration,
    keepalive: bool,
    closed: AtomicBool,
    expirations: AtomicU32,
}

impl Session {
    fn new(id: usize, config: &SimConfig) -> Self {
        Self {
            id,
            timeout: config.timeout,
            keepalive: config.keepalive,
            closed: AtomicBool::new(false),
            expirations: AtomicU32::new(0),
        }
    }

    /// Number of idle deadlines this session has hit.
    #[must_use]
    pub fn expirations(&self) -> u32 {
        self.expirations.load(Ordering::Relaxed)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Closed sessions and sessions that hit their deadline without
    /// keepalive take no more activity.
    fn is_finished(&self) -> bool {
        self.is_closed() || (!self.keepalive && self.expirations() > 0)
    }
}

impl TimerObject<Duration> for Session {
    fn on_timer<P>(&self, fired_at: Duration, ctx: &mut FireContext<'_, P, Duration>)
    where
        P: TimerHandle<Target = Self> + Clone,
    {
        let count = self.expirations.fetch_add(1, Ordering::Relaxed) + 1;
        if self.keepalive {
            log::debug!(
                "session {} idle at {fired_at:?}, keepalive #{count}",
                self.id
            );
            ctx.rearm(fired_at + self.timeout);
        } else {
            log::info!("session {} expired at {fired_at:?}", self.id);
        }
    }
}

/// Counters gathered over one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimReport {
    pub ticks: u64,
    pub fired: u64,
    pub touched: u64,
    pub closed: u64,
    pub expired_sessions: usize,
    pub remaining: usize,
    pub stats: TimerQueueStats,
}

/// Random activity source shared by both drive modes.
struct Activity {
    rng: StdRng,
    sessions: Vec<Arc<Session>>,
    touches_per_tick: u32,
    close_ratio: f64,
    timeout: Duration,
    touched: u64,
    closed: u64,
}

impl Activity {
    fn new(config: &SimConfig, sessions: Vec<Arc<Session>>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            sessions,
            touches_per_tick: config.touches_per_tick,
            close_ratio: config.close_ratio,
            timeout: config.timeout,
            touched: 0,
            closed: 0,
        }
    }

    fn tick(&mut self, queue: &mut SessionQueue, now: Duration) {
        for _ in 0..self.touches_per_tick {
            let idx = self.rng.gen_range(0..self.sessions.len());
            let session = &self.sessions[idx];
            if session.is_finished() {
                continue;
            }
            if self.rng.gen_bool(self.close_ratio) {
                session.closed.store(true, Ordering::Relaxed);
                let _ = queue.unschedule(session);
                self.closed += 1;
                log::debug!("session {} closed at {now:?}", session.id);
            } else {
                queue.schedule(Arc::clone(session), now + self.timeout);
                self.touched += 1;
            }
        }
    }
}

fn build_sessions(config: &SimConfig) -> Vec<Arc<Session>> {
    (0..config.sessions)
        .map(|id| Arc::new(Session::new(id, config)))
        .collect()
}

fn arm_all(queue: &mut SessionQueue, sessions: &[Arc<Session>], timeout: Duration) {
    for session in sessions {
        queue.schedule(Arc::clone(session), timeout);
    }
}

fn count_expired(sessions: &[Arc<Session>]) -> usize {
    sessions
        .iter()
        .filter(|session| session.expirations() > 0)
        .count()
}

fn fired_u64(fired: usize) -> u64 {
    u64::try_from(fired).unwrap_or(u64::MAX)
}

/// Runs the simulation on a virtual clock advanced by `tick` per step.
#[must_use]
pub fn run_virtual(config: &SimConfig) -> SimReport {
    let sessions = build_sessions(config);
    let mut queue = SessionQueue::with_capacity(sessions.len());
    arm_all(&mut queue, &sessions, config.timeout);
    let mut activity = Activity::new(config, sessions);

    let mut report = SimReport::default();
    let mut now = Duration::ZERO;
    while now < config.duration {
        now = (now + config.tick).min(config.duration);
        report.ticks += 1;
        activity.tick(&mut queue, now);
        report.fired += fired_u64(queue.advance(now));
    }

    report.touched = activity.touched;
    report.closed = activity.closed;
    report.expired_sessions = count_expired(&activity.sessions);
    report.remaining = queue.len();
    report.stats = queue.stats();
    report
}

struct Shared {
    queue: Mutex<SessionQueue>,
    wakeup: Condvar,
    stop: AtomicBool,
}

/// Runs the simulation against the wall clock: an activity thread touches
/// sessions every `tick` while this thread sleeps until the next deadline.
pub fn run_realtime(config: &SimConfig) -> Result<SimReport, String> {
    let sessions = build_sessions(config);
    let mut queue = SessionQueue::with_capacity(sessions.len());
    arm_all(&mut queue, &sessions, config.timeout);

    let watched = sessions.clone();
    let shared = Arc::new(Shared {
        queue: Mutex::new(queue),
        wakeup: Condvar::new(),
        stop: AtomicBool::new(false),
    });
    let start = Instant::now();

    let producer = {
        let shared = Arc::clone(&shared);
        let mut activity = Activity::new(config, sessions);
        let tick = config.tick;
        thread::Builder::new()
            .name("timerqueue-activity".to_string())
            .spawn(move || {
                let mut ticks = 0_u64;
                while !shared.stop.load(Ordering::Acquire) {
                    thread::sleep(tick);
                    let mut queue = shared.queue.lock();
                    activity.tick(&mut *queue, start.elapsed());
                    drop(queue);
                    shared.wakeup.notify_one();
                    ticks += 1;
                }
                (ticks, activity.touched, activity.closed)
            })
            .map_err(|err| format!("failed to spawn activity thread: {err}"))?
    };

    let mut fired = 0_u64;
    {
        let mut queue = shared.queue.lock();
        loop {
            let now = start.elapsed();
            fired += fired_u64(queue.advance(now));
            let Some(left) = config.duration.checked_sub(now).filter(|d| !d.is_zero()) else {
                break;
            };
            let wait = next_wait_msec(&*queue, now, EMPTY_WAIT_MSEC);
            let wait = Duration::from_millis(u64::try_from(wait).unwrap_or(0)).min(left);
            let _ = shared.wakeup.wait_for(&mut queue, wait);
        }
    }

    shared.stop.store(true, Ordering::Release);
    let (ticks, touched, closed) = producer
        .join()
        .map_err(|_| "activity thread panicked".to_string())?;

    let queue = shared.queue.lock();
    Ok(SimReport {
        ticks,
        fired,
        touched,
        closed,
        expired_sessions: count_expired(&watched),
        remaining: queue.len(),
        stats: queue.stats(),
    })
}
