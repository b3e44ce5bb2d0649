// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::sync::Arc;
use std::time::Instant;

use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::RelayError;
use crate::queue::ingestion_queue;
use crate::router::IngestRouter;
use crate::sink::SinkDispatcher;
use crate::translator::Translator;
use crate::worker_pool::WorkerPool;

pub struct Relay {
    pub config: Arc<Config>,
    pub dispatcher: Arc<dyn SinkDispatcher + Send + Sync>,
}

impl Relay {
    pub fn new(config: Arc<Config>, dispatcher: Arc<dyn SinkDispatcher + Send + Sync>) -> Self {
        Relay { config, dispatcher }
    }

    /// Binds the configured address and serves until `cancel_token` is cancelled.
    pub async fn start(&self, cancel_token: CancellationToken) -> Result<(), RelayError> {
        let addr = self.config.listen_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;
        self.serve(listener, cancel_token).await
    }

    /// Runs the front door on an already bound listener, together with the worker pool.
    ///
    /// Returns once `cancel_token` is cancelled or accepting fails. Either way the queue is
    /// closed and the workers are stopped before returning.
    pub async fn serve(
        &self,
        listener: TcpListener,
        cancel_token: CancellationToken,
    ) -> Result<(), RelayError> {
        let now = Instant::now();

        // envelopes accepted by the front door wait here for a free worker. the router owns the
        // only sender, so the queue closes when the server loop returns.
        let (queue_tx, queue_rx) = ingestion_queue(self.config.queue_capacity);

        let workers = WorkerPool::spawn(
            self.config.worker_count,
            queue_rx,
            Translator::new(self.config.attribute_encoding),
            Arc::clone(&self.dispatcher),
            cancel_token.child_token(),
        );

        let router = IngestRouter::new(
            self.config.ingest_path.as_str(),
            self.config.max_request_content_length,
            queue_tx,
        );

        let local_addr = listener.local_addr().map_err(RelayError::Accept)?;
        info!(
            "Relay started: listening on {local_addr}, route POST {}, {} workers, {} encoding",
            router.ingest_path(),
            self.config.worker_count,
            self.config.attribute_encoding
        );
        debug!(
            "Time taken to start the relay: {} ms",
            now.elapsed().as_millis()
        );

        let result = Self::serve_tcp(listener, router, cancel_token).await;

        workers.shutdown().await;
        info!("Relay stopped");
        result
    }

    async fn serve_tcp(
        listener: TcpListener,
        router: IngestRouter,
        cancel_token: CancellationToken,
    ) -> Result<(), RelayError> {
        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let conn = tokio::select! {
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(RelayError::Accept(e));
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        // Don't kill server on panic - log and continue
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
                _ = cancel_token.cancelled() => {
                    debug!("Relay cancelled, no longer accepting connections");
                    return Ok(());
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let router = router.clone();
            joinset.spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let router = router.clone();
                    async move { router.route(req).await }
                });
                if let Err(e) = server.serve_connection(conn, service).await {
                    error!("Connection error: {e}");
                }
            });
        }
    }
}
