//! API server entry point.

use api::config::{Config, LogFormat};
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Compose services and start consumers before taking traffic
    let platform = api::build_platform(&config).await?;
    let (stop_consumers, consumers_rx) = watch::channel(false);
    let consumers = platform
        .start_consumers(config.consumer_workers, consumers_rx)
        .await?;

    // 4. Serve until a signal arrives, then drain for at most the grace period
    let app = api::create_app(api::AppState::new(&platform), metrics_handle);
    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!(
        addr = %config.addr(),
        backend = ?config.store_backend,
        workers = config.consumer_workers,
        "starting API server"
    );

    let (signal_tx, mut signal_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = signal_tx.send(true);
    });

    let mut server_rx = signal_rx.clone();
    let server = async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_rx.wait_for(|stop| *stop).await;
            })
            .await
    };
    let grace = config.shutdown_grace;

    tokio::select! {
        result = server => result?,
        () = async {
            let _ = signal_rx.wait_for(|stop| *stop).await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(?grace, "grace period elapsed with open connections");
        }
    }

    // 5. Stop consumers; running handlers finish first
    stop_consumers.send_replace(true);
    if tokio::time::timeout(grace, consumers.join()).await.is_err() {
        tracing::warn!(?grace, "consumers did not stop within the grace period");
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}
