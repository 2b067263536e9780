use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use tracing::info;
use tracing::trace;

use crate::Admission;
use crate::Decision;
use crate::LimitError;
use crate::LimiterConfig;
use crate::Ticker;
use crate::WindowCounter;

/// Admits at most `max_rate` requests per sliding second.
///
/// The second is divided into `frames_per_second` slices held in a
/// [`WindowCounter`]. A [`Ticker`] advances the window by one slice every
/// `1s / frames_per_second`, so a hit stops counting between
/// `(n - 1) / n` and one second after it was recorded.
///
/// The counter lives behind a single mutex shared by request threads and the
/// ticker thread; both critical sections are O(1).
///
/// A controller is built inert. [`start`](Self::start) launches the ticker and
/// [`shutdown`](Self::shutdown), or dropping the controller, stops it again.
#[derive(Debug)]
pub struct AdmissionController {
    max_rate: u64,
    frames_per_second: u32,
    frame: Duration,
    counter: Arc<Mutex<WindowCounter>>,
    ticker: Ticker,
}

impl AdmissionController {
    /// Builds an inert controller with the default timing policy.
    ///
    /// The window does not advance until [`start`](Self::start) is called.
    /// Until then the controller admits `max_rate` requests in total and
    /// rejects everything after that.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError::InvalidConfig`] if either value is zero or the
    /// resolution is finer than a nanosecond.
    pub fn new(max_rate: u64, frames_per_second: u32) -> Result<Self, LimitError> {
        LimiterConfig::new(max_rate, frames_per_second).build()
    }

    pub(crate) fn from_config(config: LimiterConfig) -> Result<Self, LimitError> {
        config.validate()?;
        let frame = config
            .frame_duration()
            .ok_or(LimitError::InvalidConfig("frames_per_second is out of range"))?;
        let slices = NonZeroUsize::new(config.frames_per_second() as usize).ok_or(
            LimitError::InvalidConfig("frames_per_second must be greater than zero"),
        )?;

        let counter = Arc::new(Mutex::new(WindowCounter::new(slices)));
        let shared = Arc::clone(&counter);
        let mut ticker = Ticker::new(frame, move || lock(&shared).next_time_frame())?
            .with_policy(config.timing());
        if let Some(clock) = config.clock() {
            ticker = ticker.with_clock(clock.clone());
        }

        Ok(Self {
            max_rate: config.max_rate(),
            frames_per_second: config.frames_per_second(),
            frame,
            counter,
            ticker,
        })
    }

    /// Starts advancing the window.
    ///
    /// # Errors
    ///
    /// Propagates [`Ticker::start`] failures: the controller was already
    /// started, was shut down, or the ticker thread could not be spawned.
    pub fn start(&mut self) -> Result<(), LimitError> {
        self.ticker.start()?;
        info!(
            max_rate = self.max_rate,
            frames_per_second = self.frames_per_second,
            frame = ?self.frame,
            "admission controller started"
        );
        Ok(())
    }

    /// Admits the request if fewer than `max_rate` hits are inside the window.
    ///
    /// Never blocks beyond the counter lock and never queues.
    pub fn validate_request(&self) -> Decision {
        let mut counter = lock(&self.counter);
        if counter.active_sum() >= self.max_rate {
            drop(counter);
            trace!(max_rate = self.max_rate, "request rejected");
            return Decision::Rejected;
        }
        counter.add_hit();
        Decision::Accepted
    }

    /// Stops the ticker, waiting for its thread to exit.
    ///
    /// The window is frozen afterwards: requests still get a decision but no
    /// capacity is ever released again.
    pub fn shutdown(&mut self) {
        let was_running = self.ticker.is_running();
        self.ticker.deactivate();
        if was_running {
            info!(
                ticks = self.ticker.tick_count(),
                "admission controller shut down"
            );
        }
    }

    pub fn max_rate(&self) -> u64 {
        self.max_rate
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    /// Width of one slice of the window.
    pub fn frame_duration(&self) -> Duration {
        self.frame
    }

    /// Hits currently counted against the budget.
    pub fn active_sum(&self) -> u64 {
        lock(&self.counter).active_sum()
    }

    /// Window advances performed so far.
    pub fn tick_count(&self) -> u64 {
        self.ticker.tick_count()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }
}

impl Admission for AdmissionController {
    fn validate_request(&self) -> Decision {
        AdmissionController::validate_request(self)
    }

    /// Capacity can only be released at the next window advance.
    fn retry_hint(&self) -> Duration {
        self.frame
    }
}

impl Drop for AdmissionController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// The only panic possible while the lock is held is the counter's own debug
// verification, after which the counter is still structurally sound.
fn lock(counter: &Mutex<WindowCounter>) -> MutexGuard<'_, WindowCounter> {
    counter.lock().unwrap_or_else(PoisonError::into_inner)
}
