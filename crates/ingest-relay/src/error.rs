// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;

/// Errors that stop the relay from starting or serving
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0} environment variable is not set")]
    MissingConfig(&'static str),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Accept(#[source] std::io::Error),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors from a single delivery attempt to the sink
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to reach sink: {0}")]
    Transport(#[from] reqwest::Error),
}
