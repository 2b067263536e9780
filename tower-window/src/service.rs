use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use opentelemetry::global;
use opentelemetry::metrics::Counter;
use tower::BoxError;
use tower::Service;

use window_limit::Admission;
use window_limit::Decision;

use crate::error::AdmissionError;

#[derive(Clone, Debug)]
struct AdmissionServiceMetrics {
    admitted: Counter<u64>,
    rejected: Counter<u64>,
}

/// Asks the shared [`Admission`] for a decision before forwarding a request.
///
/// The decision is taken in `poll_ready`, once the inner service is ready, so
/// no budget is spent on requests that could not be served anyway. A rejection
/// is returned immediately as [`AdmissionError::Rejected`]; nothing is queued.
#[derive(Debug)]
pub struct AdmissionService<L, S>
where
    L: ?Sized,
{
    inner: S,
    limiter: Arc<L>,
    permit_acquired: bool,
    instruments: AdmissionServiceMetrics,
}

// Manually implement Clone so a clone never inherits a pending permit
impl<L, S> Clone for AdmissionService<L, S>
where
    L: ?Sized,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
            permit_acquired: false,
            instruments: self.instruments.clone(),
        }
    }
}

impl<L, S, Req> Service<Req> for AdmissionService<L, S>
where
    L: Admission + ?Sized,
    S: Service<Req, Error = BoxError>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // 1. Check inner service readiness FIRST to avoid spending budget
        match self.inner.poll_ready(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
            Poll::Ready(Ok(())) => {}
        }

        // 2. Ask for a decision if we don't hold a permit yet
        if !self.permit_acquired {
            match self.limiter.validate_request() {
                Decision::Accepted => {
                    self.instruments.admitted.add(1, &[]);
                    self.permit_acquired = true;
                }
                Decision::Rejected => {
                    self.instruments.rejected.add(1, &[]);
                    return Poll::Ready(Err(Box::new(AdmissionError::Rejected {
                        retry_after: self.limiter.retry_hint(),
                    })));
                }
            }
        }

        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        self.permit_acquired = false;
        self.inner.call(req)
    }
}

impl<L, S> AdmissionService<L, S>
where
    L: ?Sized,
{
    pub fn new(inner: S, limiter: Arc<L>) -> Self {
        let meter = global::meter("admission_service");
        let instruments = AdmissionServiceMetrics {
            admitted: meter.u64_counter("admitted").build(),
            rejected: meter.u64_counter("rejected").build(),
        };

        Self {
            inner,
            limiter,
            permit_acquired: false,
            instruments,
        }
    }

    /// The shared admission policy.
    pub fn limiter(&self) -> &Arc<L> {
        &self.limiter
    }
}
