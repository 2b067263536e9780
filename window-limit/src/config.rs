use std::time::Duration;

use quanta::Clock;

use crate::AdmissionController;
use crate::LimitError;
use crate::TimingPolicy;

/// Highest supported resolution; one slice must last at least a nanosecond.
pub const MAX_FRAMES_PER_SECOND: u32 = 1_000_000_000;

/// Settings for an [`AdmissionController`].
///
/// Rate and resolution are fixed once the controller is built.
///
/// ```rust
/// use std::time::Duration;
/// use window_limit::{LimiterConfig, TimingPolicy};
///
/// let controller = LimiterConfig::new(1_000, 100)
///     .with_timing(TimingPolicy::Sleep { slack: Duration::from_micros(200) })
///     .build()
///     .unwrap();
/// assert_eq!(controller.max_rate(), 1_000);
/// ```
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    max_rate: u64,
    frames_per_second: u32,
    timing: TimingPolicy,
    clock: Option<Clock>,
}

impl LimiterConfig {
    /// # Arguments
    ///
    /// * `max_rate` - Requests admitted per (sliding) second.
    /// * `frames_per_second` - Slices the one second window is divided into.
    pub fn new(max_rate: u64, frames_per_second: u32) -> Self {
        Self {
            max_rate,
            frames_per_second,
            timing: TimingPolicy::default(),
            clock: None,
        }
    }

    /// Set how the ticker waits between window advances.
    pub fn with_timing(mut self, timing: TimingPolicy) -> Self {
        self.timing = timing;
        self
    }

    /// Drive the window from a specific clock instead of the system one.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn max_rate(&self) -> u64 {
        self.max_rate
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    pub fn timing(&self) -> TimingPolicy {
        self.timing
    }

    pub(crate) fn clock(&self) -> Option<&Clock> {
        self.clock.as_ref()
    }

    /// Checks every value without building anything.
    ///
    /// # Errors
    ///
    /// Returns [`LimitError::InvalidConfig`] for a zero rate or a resolution
    /// outside `1..=MAX_FRAMES_PER_SECOND`.
    pub fn validate(&self) -> Result<(), LimitError> {
        if self.max_rate == 0 {
            return Err(LimitError::InvalidConfig(
                "max_rate must be greater than zero",
            ));
        }
        if self.frames_per_second == 0 {
            return Err(LimitError::InvalidConfig(
                "frames_per_second must be greater than zero",
            ));
        }
        if self.frames_per_second > MAX_FRAMES_PER_SECOND {
            return Err(LimitError::InvalidConfig(
                "frames_per_second must not exceed one frame per nanosecond",
            ));
        }
        Ok(())
    }

    /// Width of one slice, or `None` if the resolution is invalid.
    pub fn frame_duration(&self) -> Option<Duration> {
        match self.frames_per_second {
            0 => None,
            fps if fps > MAX_FRAMES_PER_SECOND => None,
            fps => Some(Duration::from_secs(1) / fps),
        }
    }

    /// Builds an inert controller; call [`AdmissionController::start`] to
    /// begin advancing the window.
    pub fn build(self) -> Result<AdmissionController, LimitError> {
        AdmissionController::from_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_accepts_sane_values() {
        let config = LimiterConfig::new(10, 100);
        assert!(config.validate().is_ok());
        assert_eq!(config.frame_duration(), Some(Duration::from_millis(10)));
        assert_eq!(config.timing(), TimingPolicy::Spin);
    }

    #[test]
    fn it_rejects_a_zero_rate() {
        let err = LimiterConfig::new(0, 100).validate().unwrap_err();
        assert!(matches!(err, LimitError::InvalidConfig(_)));
    }

    #[test]
    fn it_rejects_a_zero_resolution() {
        let config = LimiterConfig::new(10, 0);
        assert!(matches!(
            config.validate(),
            Err(LimitError::InvalidConfig(_))
        ));
        assert_eq!(config.frame_duration(), None);
    }

    #[test]
    fn it_rejects_sub_nanosecond_slices() {
        let config = LimiterConfig::new(10, MAX_FRAMES_PER_SECOND + 1);
        assert!(matches!(
            config.validate(),
            Err(LimitError::InvalidConfig(_))
        ));

        let finest = LimiterConfig::new(10, MAX_FRAMES_PER_SECOND);
        assert!(finest.validate().is_ok());
        assert_eq!(finest.frame_duration(), Some(Duration::from_nanos(1)));
    }
}
