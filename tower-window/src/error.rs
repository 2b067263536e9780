use std::time::Duration;

use tower::BoxError;

/// Errors produced by the admission middleware.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    /// The sliding window is full; the request was not forwarded.
    ///
    /// `retry_after` is the earliest point at which capacity could be
    /// released. When the `axum` feature is enabled, this converts to
    /// `429 Too Many Requests` with a `Retry-After` header.
    #[error("Too many requests; retry after {retry_after:?}")]
    Rejected {
        /// The duration to wait before retrying.
        retry_after: Duration,
    },

    /// An unexpected error occurred in the inner service.
    ///
    /// The string contains the `Display` representation of the inner error.
    /// When the `axum` feature is enabled, this converts to `500 Internal Server Error`.
    #[error("Internal service error: {0}")]
    Inner(String),
}

impl AdmissionError {
    /// Recovers an `AdmissionError` from a boxed error, wrapping anything else
    /// as [`AdmissionError::Inner`].
    pub fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<AdmissionError>() {
            Ok(err) => *err,
            Err(other) => AdmissionError::Inner(other.to_string()),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, AdmissionError::Rejected { .. })
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AdmissionError {
    fn into_response(self) -> axum::response::Response {
        use http::StatusCode;
        use http::header::RETRY_AFTER;

        let (status, msg, headers) = match self {
            Self::Rejected { retry_after } => {
                let secs = retry_after.as_secs().max(1);
                let val = http::HeaderValue::from(secs);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    self.to_string(),
                    Some((RETRY_AFTER, val)),
                )
            }
            Self::Inner(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string(), None),
        };

        let mut response = (status, msg).into_response();
        if let Some((name, value)) = headers {
            response.headers_mut().insert(name, value);
        }
        response
    }
}
