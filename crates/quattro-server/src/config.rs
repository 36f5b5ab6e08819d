//! Server configuration.
//!
//! Loading flow:
//! 1. Start with compiled [`ServerConfig::default()`]
//! 2. If a config file is given, deep-merge its JSON over the defaults
//! 3. Apply `QUATTRO_*` environment variable overrides
//!
//! CLI flags are applied by the binary on top of the result.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::ConfigError;

/// Configuration for the quattro server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (`0` for auto-assign).
    pub port: u16,
    /// Outbound messages queued per connection before it counts as a slow consumer.
    pub send_queue_capacity: usize,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this many seconds without a pong.
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// How long shutdown waits for tasks before giving up.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8001,
            send_queue_capacity: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue("host must not be empty".into()));
        }
        if self.send_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "send_queue_capacity must be at least 1".into(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "heartbeat_interval_secs must be at least 1".into(),
            ));
        }
        if self.heartbeat_timeout_secs < self.heartbeat_interval_secs {
            return Err(ConfigError::InvalidValue(format!(
                "heartbeat_timeout_secs ({}) is shorter than heartbeat_interval_secs ({})",
                self.heartbeat_timeout_secs, self.heartbeat_interval_secs
            )));
        }
        if self.max_message_size < 64 {
            return Err(ConfigError::InvalidValue(
                "max_message_size must be at least 64 bytes".into(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from an optional JSON file plus the process environment.
///
/// An explicitly named file that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let defaults = serde_json::to_value(ServerConfig::default())?;

    let merged = match path {
        Some(path) => {
            debug!(?path, "loading config from file");
            let content = std::fs::read_to_string(path)?;
            let user: Value = serde_json::from_str(&content)?;
            deep_merge(defaults, user)
        }
        None => defaults,
    };

    let mut config: ServerConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `QUATTRO_*` overrides read through `lookup`.
///
/// Values that fail to parse or fall outside their range are ignored.
pub fn apply_env_overrides(config: &mut ServerConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("QUATTRO_HOST").filter(|v| !v.trim().is_empty()) {
        config.host = v.trim().to_string();
    }
    if let Some(v) = lookup("QUATTRO_PORT").and_then(|v| parse_in_range(&v, 0u16, 65535)) {
        config.port = v;
    }
    if let Some(v) = lookup("QUATTRO_SEND_QUEUE").and_then(|v| parse_in_range(&v, 1usize, 65_536)) {
        config.send_queue_capacity = v;
    }
    if let Some(v) = lookup("QUATTRO_HEARTBEAT_INTERVAL").and_then(|v| parse_in_range(&v, 1u64, 3600)) {
        config.heartbeat_interval_secs = v;
    }
    if let Some(v) = lookup("QUATTRO_HEARTBEAT_TIMEOUT").and_then(|v| parse_in_range(&v, 1u64, 86_400)) {
        config.heartbeat_timeout_secs = v;
    }
    if let Some(v) =
        lookup("QUATTRO_MAX_MESSAGE_SIZE").and_then(|v| parse_in_range(&v, 64usize, 16 * 1024 * 1024))
    {
        config.max_message_size = v;
    }
    if let Some(v) = lookup("QUATTRO_SHUTDOWN_TIMEOUT").and_then(|v| parse_in_range(&v, 0u64, 600)) {
        config.shutdown_timeout_secs = v;
    }
}

/// Parse `val` and keep it only if it lies within `min..=max`.
fn parse_in_range<T>(val: &str, min: T, max: T) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let parsed: T = val.trim().parse().ok()?;
    (parsed >= min && parsed <= max).then_some(parsed)
}
