use crate::endpoint::{DeliveryCall, DeliveryEndpoint};
use crate::error::Result;
use axum::{
    body::Bytes,
    extract::DefaultBodyLimit,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Extension, Router,
};
use hyper::Server;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "firehose-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Delivery callback. Every method is routed here so the core can answer 405 itself.
async fn deliver(
    Extension(endpoint): Extension<Arc<DeliveryEndpoint>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let outcome = endpoint
        .handle(DeliveryCall {
            method,
            headers,
            body,
        })
        .await;
    (outcome.status, Json(outcome.response)).into_response()
}

async fn render_metrics(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}

/// Create the HTTP server with the delivery callback at `/`
pub fn create_server(endpoint: Arc<DeliveryEndpoint>, metrics: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new().route("/health", get(health));
    if let Some(handle) = metrics {
        router = router.route("/metrics", get(render_metrics).layer(Extension(handle)));
    }
    // Batches can exceed axum's 2 MB default.
    let body_limit = match endpoint.max_body_bytes() {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };
    router
        .route("/", any(deliver).layer(body_limit))
        .layer(Extension(endpoint))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Start the HTTP server on the specified address
pub async fn start_server(
    endpoint: Arc<DeliveryEndpoint>,
    metrics: Option<PrometheusHandle>,
    addr: SocketAddr,
) -> Result<()> {
    let app = create_server(endpoint, metrics);

    info!(%addr, "Delivery endpoint listening");
    Server::try_bind(&addr)?
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
