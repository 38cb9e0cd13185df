use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visage_pipeline::{FaceDetector, NullDetector};
use visage_worker::{runtime, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visage_worker=debug,visage_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();

    let pool = visage_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    visage_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    visage_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let detector: Arc<dyn FaceDetector> = Arc::new(NullDetector);
    tracing::warn!(
        detector = detector.name(),
        "No face detection backend linked, every image will report zero faces",
    );

    let ctx = WorkerContext::new(pool, config, detector);
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, finishing current job");
        signal_cancel.cancel();
    });

    if let Err(e) = runtime::run(ctx, cancel).await {
        tracing::error!(error = %e, "Worker exited with error");
        std::process::exit(1);
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
