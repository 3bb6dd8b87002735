//! HTTP endpoint scraped by Prometheus.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;

pub const METRICS_PATH: &str = "/metrics";

const INDEX_PAGE: &str = r#"<html>
<head><title>Observatory Exporter</title></head>
<body>
<h1>Observatory Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>"#;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

/// Error returned when the registry cannot be rendered.
#[derive(Debug)]
pub struct EncodingFailed;

impl IntoResponse for EncodingFailed {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route(METRICS_PATH, get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Renders whatever is cached right now; never waits on the observatory.
async fn metrics_handler(State(state): State<AppState>) -> Result<Response, EncodingFailed> {
    let encoder = TextEncoder::new();
    let families = state.registry.gather();

    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer).map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        EncodingFailed
    })?;

    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}
