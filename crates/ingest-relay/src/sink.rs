// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use crate::config::Config;
use crate::envelope::CanonicalEnvelope;
use crate::error::{DispatchError, RelayError};
use crate::http_utils::build_client;

#[async_trait]
pub trait SinkDispatcher {
    /// Makes exactly one delivery attempt. Any HTTP status counts as delivered; only
    /// serialization and transport failures are errors.
    async fn dispatch(&self, envelope: &CanonicalEnvelope) -> Result<(), DispatchError>;
}

/// Posts canonical envelopes as JSON to a fixed URL.
#[derive(Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct HttpSinkDispatcher {
    sink_url: String,
    client: reqwest::Client,
}

impl HttpSinkDispatcher {
    pub fn new(sink_url: impl Into<String>, client: reqwest::Client) -> Self {
        HttpSinkDispatcher {
            sink_url: sink_url.into(),
            client,
        }
    }

    /// Builds the dispatcher with a client honoring the configured timeout and proxy.
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        let client = build_client(config.proxy_url.as_deref(), config.sink_timeout)?;
        Ok(Self::new(config.sink_url.clone(), client))
    }

    pub fn sink_url(&self) -> &str {
        &self.sink_url
    }
}

#[async_trait]
impl SinkDispatcher for HttpSinkDispatcher {
    async fn dispatch(&self, envelope: &CanonicalEnvelope) -> Result<(), DispatchError> {
        let payload = serde_json::to_vec(envelope)?;

        let time = Instant::now();
        let response = self
            .client
            .post(&self.sink_url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;
        let elapsed = time.elapsed();

        let status = response.status();
        if status.is_success() {
            debug!(
                "Sink Dispatcher | Delivered event in {} ms, status {status}",
                elapsed.as_millis()
            );
        } else {
            warn!(
                "Sink Dispatcher | Sink answered with status {status} in {} ms",
                elapsed.as_millis()
            );
        }
        Ok(())
    }
}
