use std::fmt;
use std::hint;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use quanta::Clock;
use quanta::Instant;
use tracing::debug;
use tracing::error;

use crate::LimitError;

/// The callback a [`Ticker`] invokes on every tick.
pub type TickAction = Box<dyn FnMut() + Send + 'static>;

/// How the ticker thread waits for the next deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingPolicy {
    /// Busy-poll the monotonic clock.
    ///
    /// Fires within a few hundred nanoseconds of the deadline at the cost of
    /// keeping one core busy for the lifetime of the ticker.
    #[default]
    Spin,

    /// Sleep until `slack` before the deadline, then spin the remainder.
    ///
    /// `slack` absorbs the oversleep of the OS timer. A zero slack relies on
    /// the OS timer alone.
    Sleep { slack: Duration },
}

enum Phase {
    // The mutex is never contended; it only lets a `Send` action live inside
    // a `Sync` ticker.
    Idle(Mutex<TickAction>),
    Running(JoinHandle<()>),
    Stopped,
}

/// Runs an action on a dedicated thread, at least `interval` apart.
///
/// A ticker is built inert and only spawns its thread on [`Ticker::start`], so
/// anything the action captures is fully constructed before the first tick.
/// The interval is measured from the moment the previous action returned: a
/// slow action delays every following tick rather than causing a burst.
///
/// Stopping is cooperative and one-way. [`Ticker::deactivate`] clears the
/// running flag and joins the thread; once it returns no further ticks occur.
/// Dropping a ticker deactivates it.
pub struct Ticker {
    interval: Duration,
    policy: TimingPolicy,
    clock: Clock,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    phase: Phase,
}

impl Ticker {
    /// Creates an inert ticker that will invoke `action` every `interval`.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError::InvalidConfig`] if `interval` is zero.
    pub fn new<F>(interval: Duration, action: F) -> Result<Self, LimitError>
    where
        F: FnMut() + Send + 'static,
    {
        if interval.is_zero() {
            return Err(LimitError::InvalidConfig(
                "ticker interval must be greater than zero",
            ));
        }
        Ok(Self {
            interval,
            policy: TimingPolicy::default(),
            clock: Clock::new(),
            running: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            phase: Phase::Idle(Mutex::new(Box::new(action))),
        })
    }

    /// Set the waiting strategy used between ticks.
    pub fn with_policy(mut self, policy: TimingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a specific clock, typically `quanta::Clock::mock()` in tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Spawns the ticker thread.
    ///
    /// # Errors
    ///
    /// * [`LimitError::AlreadyStarted`] if the thread is already running.
    /// * [`LimitError::Deactivated`] if the ticker was stopped before, or its
    ///   thread died because the action panicked.
    /// * [`LimitError::Spawn`] if the thread could not be created. The action
    ///   is lost in that case and the ticker is left deactivated.
    pub fn start(&mut self) -> Result<(), LimitError> {
        let action = match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Idle(action) => action.into_inner().unwrap_or_else(PoisonError::into_inner),
            running @ Phase::Running(_) => {
                self.phase = running;
                return Err(if self.running.load(Ordering::Acquire) {
                    LimitError::AlreadyStarted
                } else {
                    LimitError::Deactivated
                });
            }
            Phase::Stopped => return Err(LimitError::Deactivated),
        };

        self.running.store(true, Ordering::Release);
        let worker = Worker {
            interval: self.interval,
            policy: self.policy,
            clock: self.clock.clone(),
            running: Arc::clone(&self.running),
            ticks: Arc::clone(&self.ticks),
            action,
        };

        match thread::Builder::new()
            .name("window-ticker".into())
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                self.phase = Phase::Running(handle);
                Ok(())
            }
            Err(err) => {
                self.running.store(false, Ordering::Release);
                Err(err.into())
            }
        }
    }

    /// Stops the ticker and waits for its thread to exit.
    ///
    /// Blocks for at most one interval plus the duration of an action already
    /// in progress. Calling this on a ticker that never started prevents it
    /// from ever starting; calling it again is a no-op.
    pub fn deactivate(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Phase::Running(handle) = std::mem::replace(&mut self.phase, Phase::Stopped)
            && handle.join().is_err()
        {
            debug!(ticks = self.tick_count(), "joined a panicked ticker thread");
        }
    }

    /// Whether the ticker thread has been started and is still ticking.
    ///
    /// Turns `false` on its own if the action panics and the thread dies.
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running(_)) && self.running.load(Ordering::Acquire)
    }

    /// Number of ticks fired so far.
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn policy(&self) -> TimingPolicy {
        self.policy
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl fmt::Debug for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Idle(_) => "idle",
            Phase::Running(_) => "running",
            Phase::Stopped => "stopped",
        };
        f.debug_struct("Ticker")
            .field("interval", &self.interval)
            .field("policy", &self.policy)
            .field("phase", &phase)
            .field("ticks", &self.tick_count())
            .finish()
    }
}

/// Marks the ticker as stopped if the action panics.
struct UnwindGuard {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
}

impl Drop for UnwindGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.running.store(false, Ordering::Release);
            error!(
                ticks = self.ticks.load(Ordering::Acquire),
                "ticker thread panicked while running its action"
            );
        }
    }
}

/// State moved onto the ticker thread.
struct Worker {
    interval: Duration,
    policy: TimingPolicy,
    clock: Clock,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    action: TickAction,
}

impl Worker {
    fn run(mut self) {
        debug!(interval = ?self.interval, policy = ?self.policy, "ticker started");
        let _unwind = UnwindGuard {
            running: Arc::clone(&self.running),
            ticks: Arc::clone(&self.ticks),
        };

        while self.running.load(Ordering::Acquire) {
            let deadline = self.clock.now() + self.interval;
            if !self.wait_until(deadline) {
                break;
            }

            let fired_at = self.clock.now();
            (self.action)();
            let tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;

            let took = self.clock.now().saturating_duration_since(fired_at);
            if took > self.interval {
                debug!(tick, ?took, interval = ?self.interval, "tick action overran its interval");
            }
        }

        debug!(ticks = self.ticks.load(Ordering::Acquire), "ticker stopped");
    }

    /// Returns `false` if the ticker was deactivated before the deadline.
    fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            if !self.running.load(Ordering::Acquire) {
                return false;
            }
            let now = self.clock.now();
            if now >= deadline {
                return true;
            }
            match self.policy {
                TimingPolicy::Sleep { slack } => {
                    let remaining = deadline.saturating_duration_since(now);
                    if remaining > slack {
                        thread::sleep(remaining - slack);
                    } else {
                        hint::spin_loop();
                    }
                }
                TimingPolicy::Spin => hint::spin_loop(),
            }
        }
    }
}
