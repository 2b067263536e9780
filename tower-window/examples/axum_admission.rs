use axum::{
    Router, error_handling::HandleErrorLayer, http::StatusCode, response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tower::BoxError;
use tower::ServiceBuilder;
use tower_window::{AdmissionError, AdmissionLayer};
use window_limit::AdmissionController;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter("info,window_limit=debug")
        .init();

    // 1. Setup the controller: 10 requests per sliding second, 100 slices
    let mut controller = AdmissionController::new(10, 100)?;
    controller.start()?;
    let limiter = Arc::new(controller);

    // 2. Build the Router
    let app = Router::new()
        .route("/", get(|| async { "Hello, Window!" }))
        .layer(
            ServiceBuilder::new()
                // 1. The outermost layer: catches BoxError and returns Response
                .layer(HandleErrorLayer::new(handle_admission_error))
                // 2. The middle layer: introduces BoxError
                .layer(AdmissionLayer::new(limiter))
                // 3. Converts the Route's Infallible to BoxError so that
                // AdmissionLayer is happy wrapping it.
                .map_err(BoxError::from),
        );

    // 3. Serve
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("listening on http://127.0.0.1:3000");

    axum::serve(listener, app).await?;
    Ok(())
}

/// The signature must match BoxError -> IntoResponse
async fn handle_admission_error(err: BoxError) -> impl IntoResponse {
    match AdmissionError::from_boxed(err) {
        rejected @ AdmissionError::Rejected { .. } => rejected.into_response(),
        AdmissionError::Inner(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Service Error").into_response()
        }
    }
}
