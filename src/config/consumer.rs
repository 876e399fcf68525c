use std::time::Duration;

use super::error::ConfigError;
use super::retry::RetryPolicy;

/// Largest batch a consumer may accumulate per partition
pub const MAX_BUFFER_SIZE: usize = 500;

pub const DEFAULT_BUFFER_SIZE: usize = 500;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_millis(200);

pub const ENV_APP_NAME: &str = "CONNECTOR_APP_NAME";
pub const ENV_STREAM_NAME: &str = "CONNECTOR_STREAM_NAME";
pub const ENV_STREAM_REGION: &str = "CONNECTOR_STREAM_REGION";
pub const ENV_BUFFER_SIZE: &str = "CONNECTOR_BUFFER_SIZE";
pub const ENV_FLUSH_INTERVAL_MS: &str = "CONNECTOR_FLUSH_INTERVAL_MS";
pub const ENV_IDLE_DELAY_MS: &str = "CONNECTOR_IDLE_DELAY_MS";

/// Process-wide consumer settings, read-only once the consumer starts
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Application name; namespaces checkpoints
    pub app_name: String,

    pub stream_name: String,

    /// Region (or endpoint) of the stream backend
    pub region: String,

    /// Records per batch handed to the handler
    pub buffer_size: usize,

    /// A non-empty buffer older than this is flushed even if not full
    pub flush_interval: Duration,

    /// Pause after a poll that returned no records
    pub idle_delay: Duration,

    pub poll_retry: RetryPolicy,
    pub handler_retry: RetryPolicy,
    pub checkpoint_retry: RetryPolicy,
}

impl ConsumerConfig {
    /// Create a configuration with default batching and retry settings
    pub fn new(
        app_name: impl Into<String>,
        stream_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            stream_name: stream_name.into(),
            region: region.into(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            idle_delay: DEFAULT_IDLE_DELAY,
            poll_retry: RetryPolicy::default(),
            handler_retry: RetryPolicy::default(),
            checkpoint_retry: RetryPolicy::unbounded(
                Duration::from_millis(100),
                Duration::from_secs(5),
            )
            .with_max_attempts(10),
        }
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    pub fn with_poll_retry(mut self, policy: RetryPolicy) -> Self {
        self.poll_retry = policy;
        self
    }

    pub fn with_handler_retry(mut self, policy: RetryPolicy) -> Self {
        self.handler_retry = policy;
        self
    }

    pub fn with_checkpoint_retry(mut self, policy: RetryPolicy) -> Self {
        self.checkpoint_retry = policy;
        self
    }

    /// Load from `CONNECTOR_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, using the `CONNECTOR_*` names
    ///
    /// Application, stream and region are required; everything else falls
    /// back to its default. The result is validated before it is returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str, field: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingField(field))
        };

        let mut config = Self::new(
            required(ENV_APP_NAME, "app_name")?,
            required(ENV_STREAM_NAME, "stream_name")?,
            required(ENV_STREAM_REGION, "region")?,
        );

        if let Some(raw) = lookup(ENV_BUFFER_SIZE) {
            config.buffer_size = parse_number(ENV_BUFFER_SIZE, &raw)? as usize;
        }
        if let Some(raw) = lookup(ENV_FLUSH_INTERVAL_MS) {
            config.flush_interval = Duration::from_millis(parse_number(ENV_FLUSH_INTERVAL_MS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_IDLE_DELAY_MS) {
            config.idle_delay = Duration::from_millis(parse_number(ENV_IDLE_DELAY_MS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check every setting; called once before any worker starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app_name.trim().is_empty() {
            return Err(ConfigError::MissingField("app_name"));
        }
        if self.stream_name.trim().is_empty() {
            return Err(ConfigError::MissingField("stream_name"));
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingField("region"));
        }
        if self.buffer_size == 0 || self.buffer_size > MAX_BUFFER_SIZE {
            return Err(ConfigError::InvalidBufferSize {
                value: self.buffer_size,
                max: MAX_BUFFER_SIZE,
            });
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::InvalidDuration("flush_interval"));
        }
        if !self.poll_retry.is_valid() {
            return Err(ConfigError::InvalidDuration("poll_retry"));
        }
        if !self.handler_retry.is_valid() {
            return Err(ConfigError::InvalidDuration("handler_retry"));
        }
        if !self.checkpoint_retry.is_valid() {
            return Err(ConfigError::InvalidDuration("checkpoint_retry"));
        }
        Ok(())
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn new_applies_defaults() {
        let config = ConsumerConfig::new("app", "orders", "us-east-1");
        assert_eq!(config.buffer_size, 500);
        assert_eq!(config.flush_interval, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_names() {
        assert_eq!(
            ConsumerConfig::new("", "orders", "us-east-1").validate(),
            Err(ConfigError::MissingField("app_name"))
        );
        assert_eq!(
            ConsumerConfig::new("app", " ", "us-east-1").validate(),
            Err(ConfigError::MissingField("stream_name"))
        );
        assert_eq!(
            ConsumerConfig::new("app", "orders", "").validate(),
            Err(ConfigError::MissingField("region"))
        );
    }

    #[test]
    fn validate_bounds_buffer_size() {
        let base = ConsumerConfig::new("app", "orders", "local");
        assert!(base.clone().with_buffer_size(1).validate().is_ok());
        assert!(base.clone().with_buffer_size(MAX_BUFFER_SIZE).validate().is_ok());
        assert_eq!(
            base.clone().with_buffer_size(0).validate(),
            Err(ConfigError::InvalidBufferSize { value: 0, max: 500 })
        );
        assert_eq!(
            base.with_buffer_size(501).validate(),
            Err(ConfigError::InvalidBufferSize { value: 501, max: 500 })
        );
    }

    #[test]
    fn validate_rejects_zero_flush_interval() {
        let config =
            ConsumerConfig::new("app", "orders", "local").with_flush_interval(Duration::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidDuration("flush_interval"))
        );
    }

    #[test]
    fn from_lookup_reads_all_fields() {
        let config = ConsumerConfig::from_lookup(lookup_from(&[
            (ENV_APP_NAME, "billing"),
            (ENV_STREAM_NAME, "orders"),
            (ENV_STREAM_REGION, "eu-west-1"),
            (ENV_BUFFER_SIZE, "25"),
            (ENV_FLUSH_INTERVAL_MS, "250"),
            (ENV_IDLE_DELAY_MS, "0"),
        ]))
        .unwrap();

        assert_eq!(config.app_name, "billing");
        assert_eq!(config.stream_name, "orders");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.buffer_size, 25);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.idle_delay, Duration::ZERO);
    }

    #[test]
    fn from_lookup_requires_names() {
        let result = ConsumerConfig::from_lookup(lookup_from(&[(ENV_APP_NAME, "billing")]));
        assert_eq!(result.unwrap_err(), ConfigError::MissingField("stream_name"));
    }

    #[test]
    fn from_lookup_rejects_garbage_numbers() {
        let result = ConsumerConfig::from_lookup(lookup_from(&[
            (ENV_APP_NAME, "billing"),
            (ENV_STREAM_NAME, "orders"),
            (ENV_STREAM_REGION, "local"),
            (ENV_BUFFER_SIZE, "lots"),
        ]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidValue {
                field: ENV_BUFFER_SIZE,
                value: "lots".to_string()
            }
        );
    }
}
