//! # Tower Window
//!
//! `tower-window` puts a [`window_limit`] admission controller in front of any
//! [Tower](https://github.com/tower-rs/tower) service.
//!
//! ## Behaviour
//!
//! 1. **Immediate decisions**: the [`AdmissionLayer`] asks the shared
//!    [`Admission`] policy once per request, after the inner service is ready.
//!    Rejected requests fail straight away with [`AdmissionError::Rejected`];
//!    nothing is queued and nothing sleeps.
//! 2. **Shared budget**: every service cloned from one layer draws on the same
//!    sliding window.
//! 3. **Metrics**: admitted and rejected requests are counted through the
//!    global OpenTelemetry meter.
//!
//! ## Feature Flags
//!
//! - `axum`: Enables `IntoResponse` for [`AdmissionError`], mapping rejections to
//!   `429 Too Many Requests` with a `Retry-After` header.

mod error;
mod layer;
mod service;
mod utils;


#[cfg(doc)]
use window_limit::Admission;

pub use error::AdmissionError;
pub use layer::AdmissionLayer;
pub use service::AdmissionService;
pub use utils::ServiceBuilderExt;
