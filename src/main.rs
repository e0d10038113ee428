//! Actions Proxy server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use actions_proxy::api::create_router;
use actions_proxy::proxy::HttpUpstream;
use actions_proxy::store::{self, KvStore, OpenedStore};
use actions_proxy::{spawn_cleanup_task, AppState, Config};

/// Main entry point for the proxy server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the shared store, falling back to the in-process store
/// 4. Start the TTL sweeper when running in-process
/// 5. Create Axum router with all endpoints
/// 6. Serve until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "actions_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Actions Proxy");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, cache_ttl={}s, rate_limit={}/{}s (block {}s), store={}",
        config.server_port,
        config.cache_ttl,
        config.rate_limit_points,
        config.rate_limit_duration,
        config.rate_limit_block_duration,
        config.cache_store_url
    );

    let (store, cleanup_handle): (Arc<dyn KvStore>, Option<JoinHandle<()>>) =
        match store::open(&config.cache_store_url, config.max_entries).await {
            OpenedStore::Redis(redis) => (Arc::new(redis), None),
            OpenedStore::Memory(memory) => {
                let handle = spawn_cleanup_task(memory.clone(), config.cleanup_interval);
                (Arc::new(memory), Some(handle))
            }
        };
    info!("Store ready (backend={})", store.backend());

    let upstream = HttpUpstream::new(&config.user_agent, config.upstream_timeout())
        .context("failed to build upstream HTTP client")?;

    let state = AppState::new(store, Arc::new(upstream), &config);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cleanup_handle))
    .await
    .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweeper.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cleanup task aborted");
    }
}
