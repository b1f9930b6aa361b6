//! Tracker configuration

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Settings for one order tracker instance.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Address handed to the controller connection (e.g. "127.0.0.1")
    pub remote_address: String,

    /// Snapshot file for tracked orders
    pub store_path: PathBuf,

    /// Prefix of the transaction tag sent with each enqueue
    pub transaction_prefix: String,

    /// Number of service openings on each lift; drafts must pick 1..=n
    pub service_openings: u32,

    /// Upper bound on each remote command. `None` waits indefinitely.
    pub command_timeout: Option<Duration>,

    /// Buffered notifications per subscriber before the slowest lags
    pub notification_capacity: usize,

    /// Port for the /metrics endpoint; `None` disables it
    pub metrics_port: Option<u16>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            remote_address: "127.0.0.1".to_string(),
            store_path: PathBuf::from("MyOrders.dat"),
            transaction_prefix: "MiniWMS".to_string(),
            service_openings: 3,
            command_timeout: None,
            notification_capacity: 256,
            metrics_port: None,
        }
    }
}

impl TrackerConfig {
    pub fn new(remote_address: impl Into<String>) -> Self {
        Self {
            remote_address: remote_address.into(),
            ..Self::default()
        }
    }

    /// Build from `WMS_*` environment variables, defaulting anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(addr) = env::var("WMS_REMOTE_ADDR") {
            config.remote_address = addr;
        }
        if let Ok(path) = env::var("WMS_STORE_PATH") {
            config.store_path = PathBuf::from(path);
        }
        if let Ok(prefix) = env::var("WMS_TRANSACTION_PREFIX") {
            config.transaction_prefix = prefix;
        }
        if let Some(openings) = parse_var::<u32>("WMS_SERVICE_OPENINGS")? {
            config.service_openings = openings;
        }
        if let Some(ms) = parse_var::<u64>("WMS_COMMAND_TIMEOUT_MS")? {
            config.command_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(capacity) = parse_var::<usize>("WMS_NOTIFICATION_CAPACITY")? {
            config.notification_capacity = capacity;
        }
        if let Some(port) = parse_var::<u16>("WMS_METRICS_PORT")? {
            config.metrics_port = Some(port);
        }

        Ok(config)
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_transaction_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.transaction_prefix = prefix.into();
        self
    }

    pub fn with_service_openings(mut self, openings: u32) -> Self {
        self.service_openings = openings;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(None),
    }
}
