mod auth;
mod batch_scheduler;
mod dto;
mod error_mapping;
mod handlers;
mod metrics;
mod rate_limit;
mod routes;
mod shutdown;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use billing_core::config::BillingConfig;
use billing_core::service::NoopEventPublisher;
use billing_logic::batch::DelinquencyBatch;
use billing_logic::services::{CustomerServiceImpl, LoanServiceImpl};
use billing_postgres::{PostgresCustomerRepository, PostgresLoanRepository};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::metrics::Metrics;
use crate::rate_limit::build_limiter;
use crate::state::AppState;

fn load_config() -> anyhow::Result<BillingConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(config::Environment::with_prefix("BILLING").separator("__"))
        .build()?;
    Ok(settings.try_deserialize()?)
}

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
    let config = load_config()?;
    init_tracing(&config.logger);

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await?;

    sqlx::migrate!("../billing-postgres/migrations").run(&pool).await?;

    let customer_repository = Arc::new(PostgresCustomerRepository::new(pool.clone()));
    let loan_repository = Arc::new(PostgresLoanRepository::new(pool.clone()));

    let publisher: Arc<dyn billing_core::service::EventPublisher> =
        match billing_amqp::open_connection(&config.amqp.connection_uri()).await {
            Ok(connection) => {
                let channel = connection.create_channel().await?;
                billing_amqp::declare_topology(&channel, &config.amqp.exchange, None).await?;
                Arc::new(billing_amqp::LapinEventPublisher::new(
                    connection,
                    config.amqp.exchange.clone(),
                    "billing-server",
                ))
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to connect to amqp broker, falling back to a no-op publisher");
                Arc::new(NoopEventPublisher)
            }
        };

    let loan_service = Arc::new(LoanServiceImpl::new(
        loan_repository.clone(),
        customer_repository.clone(),
        publisher.clone(),
    ));
    let customer_service = Arc::new(CustomerServiceImpl::new(
        customer_repository.clone(),
        loan_repository.clone(),
        publisher.clone(),
    ));

    let delinquency_batch = Arc::new(DelinquencyBatch::new(
        loan_repository.clone(),
        loan_service.clone(),
        customer_service.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let batch_handle = batch_scheduler::spawn(
        delinquency_batch,
        config.batch.cron.clone(),
        config.batch.timeout_secs,
        shutdown_rx,
    );

    let rate_limiter = build_limiter(config.rate_limit.requests_per_second, config.rate_limit.burst);
    let port = config.server.port;
    let shutdown_grace = Duration::from_secs(config.server.shutdown_grace_secs);

    let app_state = Arc::new(AppState {
        loan_service,
        customer_service,
        config,
        metrics: Arc::new(Metrics::new()),
        rate_limiter,
    });

    let router = routes::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "billing-server listening");

    let server = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown::wait_for_signal(shutdown_tx));

    server.await?;

    shutdown::wait_with_grace("delinquency-batch", batch_handle, shutdown_grace).await;
    pool.close().await;

    Ok(())
}
