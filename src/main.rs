use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vinyldns_webhook::{router, AppState, Config, VinylDnsProvider};

// ─────────────────────────────────────────────────────────────────────────────
// Shutdown
// ─────────────────────────────────────────────────────────────────────────────

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
    token.cancel();
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => {
            eprintln!(
                "[tracing] using RUST_LOG={}",
                std::env::var("RUST_LOG").unwrap_or_default()
            );
            f
        }
        Err(e) => {
            let default = "external_dns_vinyldns_webhook=debug,vinyldns_webhook=debug,tower_http=debug";
            eprintln!("[tracing] RUST_LOG not set or invalid ({e}), defaulting to: {default}");
            EnvFilter::new(default)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(false)
                .with_ansi(true),
        )
        .init();

    let cfg = Config::from_env()?;
    let port = cfg.port;

    info!("VinylDNS API  : {}", cfg.vinyldns_host.as_deref().unwrap_or("(unset)"));
    info!(
        "Zone filter   : {}",
        if cfg.zone_filter().is_empty() { "(all zones)" } else { cfg.zone_id_filter.as_str() }
    );
    info!("Default TTL   : {}s", cfg.default_ttl);

    let provider = VinylDnsProvider::new(&cfg)?;
    info!("Dry run       : {}", provider.is_dry_run());
    let shutdown = CancellationToken::new();
    let state = AppState {
        cfg,
        provider,
        shutdown: shutdown.clone(),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}
