use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{net::SocketAddr, time::Duration};

use tribunal_core::DispatchOptions;

use crate::messaging::RetryPolicy;
use crate::observability::LogFormat;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Retry policy of the case-event queue consumer
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    /// Outbound hearing request channel
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.dispatch.handler_timeout_ms == 0 {
            return Err("dispatch.handler_timeout_ms must be > 0".into());
        }
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be > 0".into());
        }
        if self.retry.attempt_timeout_ms == 0 {
            return Err("retry.attempt_timeout_ms must be > 0".into());
        }
        if self.retry.backoff_base_ms > self.retry.backoff_max_ms {
            return Err("retry.backoff_base_ms must be <= retry.backoff_max_ms".into());
        }
        if self.listener.concurrency == 0 {
            return Err("listener.concurrency must be > 0".into());
        }
        if self.listener.queue_capacity == 0 {
            return Err("listener.queue_capacity must be > 0".into());
        }
        if self.publisher.partitions == 0 {
            return Err("publisher.partitions must be > 0".into());
        }
        if self.publisher.send_timeout_ms == 0 {
            return Err("publisher.send_timeout_ms must be > 0".into());
        }
        if self.notifications.enabled
            && self.notifications.url.as_deref().unwrap_or("").is_empty()
        {
            return Err("notifications.enabled=true requires notifications.url".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn dispatch_options(&self) -> DispatchOptions {
        DispatchOptions {
            handler_timeout: Duration::from_millis(self.dispatch.handler_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            attempt_timeout: Duration::from_millis(self.retry.attempt_timeout_ms),
            backoff_base: Duration::from_millis(self.retry.backoff_base_ms),
            backoff_max: Duration::from_millis(self.retry.backoff_max_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    2 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `text` or `json`
    #[serde(default)]
    pub format: LogFormat,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,
}
fn default_handler_timeout_ms() -> u64 {
    30_000
}
impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout_ms: default_handler_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}
fn default_max_attempts() -> u32 {
    3
}
fn default_attempt_timeout_ms() -> u64 {
    60_000
}
fn default_backoff_base_ms() -> u64 {
    100
}
fn default_backoff_max_ms() -> u64 {
    5_000
}
impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Messages processed at the same time per listener
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}
fn default_concurrency() -> usize {
    4
}
fn default_queue_capacity() -> usize {
    256
}
impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// When false every route uses the no-op publisher
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_partitions")]
    pub partitions: usize,
    #[serde(default = "default_partition_capacity")]
    pub partition_capacity: usize,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}
fn default_true() -> bool {
    true
}
fn default_partitions() -> usize {
    4
}
fn default_partition_capacity() -> usize {
    128
}
fn default_send_timeout_ms() -> u64 {
    5_000
}
impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            partitions: default_partitions(),
            partition_capacity: default_partition_capacity(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
    /// HMAC-SHA256 key for the X-Signature-256 header
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_notification_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}
fn default_notification_timeout_ms() -> u64 {
    10_000
}
impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            secret: None,
            timeout_ms: default_notification_timeout_ms(),
            headers: HashMap::new(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_FILE: &str = "tribunal.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., TRIBUNAL__RETRY__MAX_ATTEMPTS=5
        builder = builder.add_source(
            Environment::with_prefix("TRIBUNAL")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
