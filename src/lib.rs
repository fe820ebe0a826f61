//! external-dns webhook provider backed by VinylDNS.

pub mod config;
pub mod dns;
pub mod error;
pub mod handlers;
pub mod normalize;
pub mod provider;
pub mod vinyldns;
pub mod zone_filter;

use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub use crate::{
    config::Config,
    dns::{Change, ChangeAction, Endpoint},
    error::{ApplyError, ClientError, ProviderError},
    provider::VinylDnsProvider,
    vinyldns::{RecordDirectory, VinylDnsClient},
    zone_filter::ZoneIdFilter,
};

// ─────────────────────────────────────────────────────────────────────────────
// Shared application state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub provider: VinylDnsProvider,
    /// Cancelled on shutdown; aborts in-flight provider calls.
    pub shutdown: CancellationToken,
}

// ─────────────────────────────────────────────────────────────────────────────
// Request body logging middleware
//
// Only active at DEBUG level or below. Reads the full body into memory,
// logs it, then puts it back so the actual handler can still deserialise it.
// ─────────────────────────────────────────────────────────────────────────────

async fn log_request_body(req: Request, next: Next) -> Response {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return next.run(req).await;
    }

    let (parts, body) = req.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            tracing::error!("failed to read request body: {e}");
            return next.run(Request::from_parts(parts, Body::empty())).await;
        }
    };

    if !bytes.is_empty() {
        let body_str = std::str::from_utf8(&bytes)
            .map(|s| {
                // Pretty-print if it's valid JSON, otherwise show raw
                serde_json::from_str::<serde_json::Value>(s)
                    .ok()
                    .and_then(|v| serde_json::to_string_pretty(&v).ok())
                    .unwrap_or_else(|| s.to_string())
            })
            .unwrap_or_else(|_| format!("<{} binary bytes>", bytes.len()));

        debug!(
            method = %parts.method,
            path   = %parts.uri.path(),
            body   = %body_str,
            "← request body"
        );
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/",                get(handlers::negotiate))
        .route("/healthz",         get(handlers::healthz))
        .route("/records",         get(handlers::get_records).post(handlers::apply_changes))
        .route("/adjustendpoints", post(handlers::adjust_endpoints))
        // log_request_body runs before handlers; only logs at DEBUG level
        .layer(middleware::from_fn(log_request_body))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
