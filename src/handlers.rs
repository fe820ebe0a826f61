use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, info};

use crate::{
    dns::{Change, Changes, DomainFilter, Endpoint},
    error::ProviderError,
    AppState,
};

// Content-Type required by the external-dns webhook protocol
pub const WEBHOOK_CT: &str = "application/external.dns.webhook+json;version=1";

fn webhook_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert("Content-Type", HeaderValue::from_static(WEBHOOK_CT));
    h
}

// ── GET /healthz ──────────────────────────────────────────────────────────────

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

// ── GET / ─────────────────────────────────────────────────────────────────────
// Domain-filter negotiation: advertise the names of the managed zones.

pub async fn negotiate(State(state): State<AppState>) -> Response {
    match state.provider.managed_zones(&state.shutdown).await {
        Ok(zones) => {
            let filter = DomainFilter {
                include: zones
                    .into_iter()
                    .map(|z| z.name.trim_end_matches('.').to_string())
                    .collect(),
                exclude: vec![],
            };
            (webhook_headers(), Json(filter)).into_response()
        }
        Err(e) => {
            error!("GET / error: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ── GET /records ──────────────────────────────────────────────────────────────

pub async fn get_records(State(state): State<AppState>) -> Response {
    match state.provider.records(&state.shutdown).await {
        Ok(eps) => {
            info!("GET /records → {} endpoint(s)", eps.len());
            (webhook_headers(), Json(eps)).into_response()
        }
        Err(e) => {
            error!("GET /records error: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ── POST /records ─────────────────────────────────────────────────────────────

pub async fn apply_changes(
    State(state): State<AppState>,
    Json(changes): Json<Changes>,
) -> Response {
    info!(
        "POST /records: {} create, {} update, {} delete",
        changes.create.len(),
        changes.update_new.len(),
        changes.delete.len()
    );
    let changes: Vec<Change> = changes.into();

    match state.provider.apply_changes(changes, &state.shutdown).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(ProviderError::Apply(e)) => {
            error!("POST /records: {e}");
            let failed: Vec<_> = e
                .failures
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "index": f.index,
                        "action": f.action.to_string(),
                        "dnsName": f.dns_name,
                        "recordType": f.record_type,
                        "reason": f.reason.to_string(),
                    })
                })
                .collect();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": e.to_string(), "failed": failed})),
            )
                .into_response()
        }
        Err(e) => {
            error!("POST /records error: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

// ── POST /adjustendpoints ─────────────────────────────────────────────────────
//
// Called by external-dns before planning. Desired endpoints are brought into
// the shape `GET /records` reports, so unchanged records don't show up as
// diffs: no trailing dot on the name, and the default TTL where none is set.

pub async fn adjust_endpoints(
    State(state): State<AppState>,
    Json(mut endpoints): Json<Vec<Endpoint>>,
) -> impl IntoResponse {
    let default_ttl = state.cfg.default_ttl;
    for ep in &mut endpoints {
        adjust_endpoint(ep, default_ttl);
    }
    (webhook_headers(), Json(endpoints))
}

fn adjust_endpoint(ep: &mut Endpoint, default_ttl: u32) {
    if ep.dns_name.ends_with('.') {
        ep.dns_name = ep.dns_name.trim_end_matches('.').to_string();
    }
    if ep.record_ttl == 0 {
        debug!("{} {} → default TTL {default_ttl}s", ep.record_type, ep.dns_name);
        ep.record_ttl = default_ttl;
    }
}

// ── helpers ───────────────────────────────────────────────────────────────────

fn error_response(code: StatusCode, msg: String) -> Response {
    (code, Json(serde_json::json!({"error": msg}))).into_response()
}
