// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::error::RelayError;
use crate::normalizer::AttributeEncoding;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_INGEST_PATH: &str = "/receive";
const DEFAULT_WORKER_COUNT: usize = 3;
const MAX_WORKER_COUNT: usize = 64;
const DEFAULT_QUEUE_CAPACITY: usize = 10;
const DEFAULT_SINK_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_REQUEST_CONTENT_LENGTH: usize = 10 * 1024 * 1024; // 10MB in Bytes
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// path of the single ingest route
    pub ingest_path: String,
    /// where canonical events are POSTed
    pub sink_url: String,
    pub worker_count: usize,
    /// how many accepted events may wait for a free worker
    pub queue_capacity: usize,
    pub attribute_encoding: AttributeEncoding,
    /// bound on a single delivery attempt
    pub sink_timeout: Duration,
    pub max_request_content_length: usize,
    pub proxy_url: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ingest_path: DEFAULT_INGEST_PATH.to_string(),
            sink_url: String::new(),
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            attribute_encoding: AttributeEncoding::default(),
            sink_timeout: Duration::from_secs(DEFAULT_SINK_TIMEOUT_SECS),
            max_request_content_length: DEFAULT_MAX_REQUEST_CONTENT_LENGTH,
            proxy_url: None,
            log_level: "info".to_string(),
        }
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|val| val.trim().parse::<T>().ok())
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Config, RelayError> {
        let sink_url =
            env::var("RELAY_SINK_URL").map_err(|_| RelayError::MissingConfig("RELAY_SINK_URL"))?;

        let attribute_encoding = match env::var("RELAY_ATTRIBUTE_ENCODING") {
            Ok(val) => val
                .parse::<AttributeEncoding>()
                .map_err(RelayError::InvalidConfig)?,
            Err(_) => AttributeEncoding::default(),
        };

        let config = Config {
            host: env::var("RELAY_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: parsed_var("RELAY_PORT").unwrap_or(DEFAULT_PORT),
            ingest_path: env::var("RELAY_INGEST_PATH")
                .unwrap_or_else(|_| DEFAULT_INGEST_PATH.to_string()),
            sink_url,
            worker_count: parsed_var("RELAY_WORKER_COUNT").unwrap_or(DEFAULT_WORKER_COUNT),
            queue_capacity: parsed_var("RELAY_QUEUE_CAPACITY").unwrap_or(DEFAULT_QUEUE_CAPACITY),
            attribute_encoding,
            sink_timeout: Duration::from_secs(
                parsed_var("RELAY_SINK_TIMEOUT_SECS").unwrap_or(DEFAULT_SINK_TIMEOUT_SECS),
            ),
            max_request_content_length: parsed_var("RELAY_MAX_REQUEST_CONTENT_LENGTH")
                .unwrap_or(DEFAULT_MAX_REQUEST_CONTENT_LENGTH),
            proxy_url: env::var("RELAY_PROXY_HTTPS")
                .or_else(|_| env::var("HTTPS_PROXY"))
                .ok(),
            log_level: env::var("RELAY_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or_else(|_| "info".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.port == 0 {
            return Err(RelayError::InvalidConfig(
                "port must be greater than 0".to_string(),
            ));
        }

        if self.host.trim().parse::<IpAddr>().is_err() {
            return Err(RelayError::InvalidConfig(format!(
                "host '{}' is not an IP address",
                self.host
            )));
        }

        if !self.ingest_path.starts_with('/') {
            return Err(RelayError::InvalidConfig(format!(
                "ingest path '{}' must start with '/'",
                self.ingest_path
            )));
        }

        if !(self.sink_url.starts_with("http://") || self.sink_url.starts_with("https://")) {
            return Err(RelayError::InvalidConfig(format!(
                "sink url '{}' must be an http:// or https:// url",
                self.sink_url
            )));
        }

        if self.worker_count == 0 || self.worker_count > MAX_WORKER_COUNT {
            return Err(RelayError::InvalidConfig(format!(
                "worker count must be between 1 and {MAX_WORKER_COUNT}, got {}",
                self.worker_count
            )));
        }

        if self.queue_capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.sink_timeout.is_zero() {
            return Err(RelayError::InvalidConfig(
                "sink timeout must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(RelayError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Address the front door listens on. Only meaningful after [`Config::validate`] passed.
    pub fn listen_addr(&self) -> Result<SocketAddr, RelayError> {
        let ip = self.host.trim().parse::<IpAddr>().map_err(|_| {
            RelayError::InvalidConfig(format!("host '{}' is not an IP address", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
