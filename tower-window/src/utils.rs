use std::sync::Arc;

use tower::ServiceBuilder;
use tower::layer::util::Stack;

use window_limit::Admission;

use crate::AdmissionLayer;

/// Service Builder Extension with admission control for tower::ServiceBuilder.
pub trait ServiceBuilderExt<L> {
    /// Reject requests once the shared sliding window is full
    fn admission_control(
        self,
        limiter: Arc<dyn Admission + Send + Sync + 'static>,
    ) -> ServiceBuilder<Stack<AdmissionLayer<dyn Admission + Send + Sync + 'static>, L>>;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn admission_control(
        self,
        limiter: Arc<dyn Admission + Send + Sync + 'static>,
    ) -> ServiceBuilder<Stack<AdmissionLayer<dyn Admission + Send + Sync + 'static>, L>> {
        self.layer(AdmissionLayer::new(limiter))
    }
}
