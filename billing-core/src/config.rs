use serde::{Deserialize, Serialize};

/// Configuration shared by the billing server and the notify service,
/// loaded via the `config` crate: a base YAML file overridden by
/// environment variables (`BILLING_*` / `NOTIFY_*`, double-underscore
/// nested separator), per spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_shutdown_grace_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_idle_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_jwt_ttl_hours")]
    pub ttl_hours: i64,
}

fn default_jwt_ttl_hours() -> i64 {
    24
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst: u32,
}

fn default_rps() -> u32 {
    20
}

fn default_burst() -> u32 {
    40
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_batch_cron")]
    pub cron: String,
    #[serde(default = "default_batch_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_batch_cron() -> String {
    "0 0 2 * * *".to_string()
}

fn default_batch_timeout_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmqpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default = "default_consumer_tag")]
    pub consumer_tag: String,
}

fn default_exchange() -> String {
    "billing-engine".to_string()
}

fn default_queue() -> String {
    "billing-engine.notify".to_string()
}

fn default_consumer_tag() -> String {
    "notify-service".to_string()
}

impl AmqpConfig {
    pub fn connection_uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.username, self.password, self.host, self.port
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_encoding")]
    pub encoding: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_encoding() -> String {
    "json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    pub port: u16,
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Root configuration for `billing-server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub batch: BatchConfig,
    pub amqp: AmqpConfig,
    pub logger: LoggerConfig,
    pub metrics: MetricsConfig,
}

/// Root configuration for `notify-service`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub database: DatabaseConfig,
    pub amqp: AmqpConfig,
    pub logger: LoggerConfig,
    pub metrics: MetricsConfig,
}
