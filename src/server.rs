use crate::collector::Collector;
use crate::metrics::{encode_text, HandlerInstrumenter};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{error, info};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

pub const METRICS_PATH: &str = "/metrics";

#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    /// Process-level families (request instrumentation) appended after the
    /// collector's own.
    pub registry: Registry,
    pub instrumenter: HandlerInstrumenter,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let mut families = state.collector.scrape().await;
    families.extend(state.registry.gather());

    let (status, body) = match encode_text(&families) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    };
    let code = status.as_u16();
    state
        .instrumenter
        .observe(METRICS_PATH, "GET", code, started.elapsed());
    state.instrumenter.observe_sizes(
        METRICS_PATH,
        "GET",
        code,
        content_length(&headers),
        body.len() as u64,
    );
    if status.is_success() {
        (status, [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response()
    } else {
        (status, body).into_response()
    }
}

fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Starting HTTP server at {}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
