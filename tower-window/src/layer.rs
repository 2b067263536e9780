use std::sync::Arc;

use tower::Layer;
use window_limit::Admission;

use crate::service::AdmissionService;

/// Applies admission control to requests.
///
/// Every service produced by one layer shares the same budget.
#[derive(Debug)]
pub struct AdmissionLayer<L>
where
    L: ?Sized,
{
    limiter: Arc<L>,
}

impl<L> Clone for AdmissionLayer<L>
where
    L: ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<L> AdmissionLayer<L>
where
    L: Admission + ?Sized,
{
    /// Create an AdmissionLayer
    pub fn new(limiter: Arc<L>) -> Self {
        AdmissionLayer { limiter }
    }
}

impl<L, S> Layer<S> for AdmissionLayer<L>
where
    L: ?Sized,
{
    type Service = AdmissionService<L, S>;

    fn layer(&self, service: S) -> Self::Service {
        AdmissionService::new(service, Arc::clone(&self.limiter))
    }
}
