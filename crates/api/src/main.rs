use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use visage_api::background::lease_reaper::{self, ReaperConfig};
use visage_api::config::ServerConfig;
use visage_api::router::build_app_router;
use visage_api::state::AppState;
use visage_db::DbPool;

/// How long the reaper gets to finish its current sweep at shutdown.
const REAPER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visage_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        uploads = %config.upload_dir.display(),
        results = %config.results_dir.display(),
        "Coordinator configuration loaded",
    );

    let pool = open_store(&config).await;
    prepare_storage_dirs(&config).await;

    let reaper_cancel = CancellationToken::new();
    let reaper = spawn_lease_reaper(pool.clone(), &config, reaper_cancel.clone());

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!(%addr, "Coordinator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Stopped accepting requests");
    reaper_cancel.cancel();
    if tokio::time::timeout(REAPER_SHUTDOWN_GRACE, reaper).await.is_err() {
        tracing::warn!("Lease reaper did not stop in time");
    }
    tracing::info!("Coordinator shut down");
}

/// Connect to the shared SQLite store, verify it answers, and migrate it.
async fn open_store(config: &ServerConfig) -> DbPool {
    let pool = visage_db::create_pool(&config.database_url)
        .await
        .expect("Failed to open the job store");
    visage_db::health_check(&pool)
        .await
        .expect("Job store health check failed");
    visage_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!(url = %config.database_url, "Job store ready");
    pool
}

/// Create the upload, results and known-faces directories.
async fn prepare_storage_dirs(config: &ServerConfig) {
    for dir in [&config.upload_dir, &config.results_dir, &config.known_faces_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .unwrap_or_else(|e| panic!("Failed to create {}: {e}", dir.display()));
    }
}

fn spawn_lease_reaper(
    pool: DbPool,
    config: &ServerConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(lease_reaper::run(
        pool,
        ReaperConfig {
            interval: Duration::from_secs(config.reaper_interval_secs),
            max_deliveries: config.max_deliveries,
        },
        cancel,
    ))
}

/// Resolve on SIGINT or SIGTERM. In-flight requests are drained by axum
/// afterwards; worker processes are unaffected.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
