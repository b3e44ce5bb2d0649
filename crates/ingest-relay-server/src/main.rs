// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process::ExitCode, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use ingest_relay::{config::Config, relay::Relay, sink::HttpSinkDispatcher};

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("RELAY_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,reqwest=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match Config::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Error creating config on relay startup: {e}");
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = match HttpSinkDispatcher::from_config(&config) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            error!("Error creating sink dispatcher: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!("Forwarding events to {}", dispatcher.sink_url());

    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel_token.clone()));

    let relay = Relay::new(config, dispatcher);
    match relay.start(cancel_token).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Relay stopped with an error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn cancel_on_shutdown_signal(cancel_token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM: {e}");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received SIGINT, shutting down");
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {e}");
            return;
        }
        info!("Received ctrl-c, shutting down");
    }
    cancel_token.cancel();
}
