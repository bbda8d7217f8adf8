mod config_loader;
mod handler;
mod mapper;
mod metrics;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use billing_amqp::EventConsumer;
use notify_core::projection::CustomerProjection;
use notify_postgres::PostgresCustomerProjection;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::handler::ProjectionEventHandler;
use crate::metrics::Metrics;

fn init_tracing(cfg: &billing_core::config::LoggerConfig) {
    let filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg.encoding == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config_loader::load_config()?;
    init_tracing(&config.logger);

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("../notify-postgres/migrations").run(&pool).await?;

    let projection: Arc<dyn CustomerProjection> = Arc::new(PostgresCustomerProjection::new(pool.clone()));
    let metrics = Arc::new(Metrics::new());
    let handler = Arc::new(ProjectionEventHandler::new(projection, metrics.clone()));

    let connection = billing_amqp::open_connection(&config.amqp.connection_uri()).await?;
    let consumer = EventConsumer::new(
        connection,
        config.amqp.exchange.clone(),
        config.amqp.queue.clone(),
        config.amqp.consumer_tag.clone(),
        handler,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics_router = metrics::build_router(metrics.clone(), &config.metrics.path);
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.metrics.port));
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr).await?;
    tracing::info!(%metrics_addr, "notify-service health/metrics listening");

    let mut metrics_shutdown = shutdown_rx.clone();
    let metrics_server = tokio::spawn(async move {
        let server = axum::serve(metrics_listener, metrics_router).with_graceful_shutdown(async move {
            let _ = metrics_shutdown.changed().await;
        });
        if let Err(err) = server.await {
            tracing::error!(error = %err, "metrics server exited with an error");
        }
    });

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
        tracing::info!("shutdown signal received, draining consumer");
        let _ = signal_tx.send(true);
    });

    consumer.run(shutdown_rx).await?;
    let _ = metrics_server.await;
    pool.close().await;

    Ok(())
}
