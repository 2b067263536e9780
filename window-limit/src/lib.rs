//! # window-limit
//!
//! `window-limit` admits at most `N` requests per sliding second, using a
//! fixed-resolution window that a background ticker advances on a wall-clock
//! cadence.
//!
//! ## Core Philosophy
//!
//! The second is cut into `frames_per_second` slices kept in a circular buffer.
//! The buffer maintains its total incrementally, so checking a request, recording
//! a hit and advancing the window are all O(1). A dedicated thread busy-polls a
//! monotonic clock and advances the window once per slice; request threads never
//! look at the clock at all.
//!
//! ## Key Concepts
//!
//! * **Window Counter**: the circular buffer and its running total. It has no
//!   locking of its own.
//! * **Ticker**: runs an action at least `interval` apart on its own thread.
//!   Built inert, started explicitly, stopped cooperatively.
//! * **Admission Controller**: one counter and one ticker behind a single mutex.
//!   Every decision is immediate: there is no queueing and no waiting.
//!
//! ## Example
//!
//! ```rust
//! use window_limit::AdmissionController;
//! use window_limit::Decision;
//!
//! let mut limiter = AdmissionController::new(100, 10).unwrap();
//! limiter.start().unwrap();
//!
//! if limiter.validate_request() == Decision::Accepted {
//!     // Request allowed
//! }
//!
//! limiter.shutdown();
//! ```

use std::fmt::Debug;
use std::time::Duration;

mod config;
mod controller;
mod decision;
mod error;
mod ticker;
mod window_counter;

pub use config::LimiterConfig;
pub use config::MAX_FRAMES_PER_SECOND;
pub use controller::AdmissionController;
pub use decision::Decision;
pub use error::LimitError;
pub use ticker::TickAction;
pub use ticker::Ticker;
pub use ticker::TimingPolicy;
pub use window_counter::WindowCounter;

/// Anything that can make an immediate admit-or-reject decision.
///
/// Implementations must be `Send` and `Sync` to be shared across threads via
/// `Arc`, which is how the tower middleware holds them.
pub trait Admission: Debug {
    /// Decides whether one request may proceed. Must not block.
    fn validate_request(&self) -> Decision;

    /// A lower bound on how long a rejected caller should wait before the
    /// decision can change.
    fn retry_hint(&self) -> Duration {
        Duration::ZERO
    }
}
