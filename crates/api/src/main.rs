//! Gateway server entry point.

use api::config::Config;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
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
async fn main() {
    // 1. Tracing, installed before configuration is read
    tracing_subscriber::registry()
        .with(EnvFilter::new(Config::log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // 2. Prometheus recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Backends, breakers and the retry worker
    let (state, worker) =
        api::create_http_state(&config).expect("failed to build backend HTTP clients");
    let worker = worker.spawn();
    tracing::info!(
        log_filter = %config.log_level,
        library = %config.backends.library_url,
        reservation = %config.backends.reservation_url,
        rating = %config.backends.rating_url,
        max_failures = config.breaker.max_failures,
        reset_timeout_ms = config.breaker.reset_timeout.as_millis() as u64,
        retry_cooldown_ms = config.retry.cooldown.as_millis() as u64,
        "gateway configured"
    );

    // 4. Serve
    let app = api::create_app(state.clone(), metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting gateway");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Queued tasks hold scheduler handles of their own, so stop the worker
    // explicitly.
    let pending = state.coordinator.scheduler().pending();
    if pending > 0 {
        tracing::warn!(pending, "discarding deferred requests on shutdown");
    }
    worker.abort();
    tracing::info!("server shut down gracefully");
}
