// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::envelope::IncomingEnvelope;
use crate::queue::QueueReceiver;
use crate::sink::SinkDispatcher;
use crate::translator::Translator;

/// Fixed set of workers draining the ingestion queue.
pub struct WorkerPool {
    workers: JoinSet<()>,
    cancel_token: CancellationToken,
}

impl WorkerPool {
    /// Spawns `worker_count` workers. They run until the queue closes or `cancel_token` fires.
    pub fn spawn(
        worker_count: usize,
        queue: QueueReceiver,
        translator: Translator,
        dispatcher: Arc<dyn SinkDispatcher + Send + Sync>,
        cancel_token: CancellationToken,
    ) -> Self {
        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            let worker = Worker {
                id,
                queue: queue.clone(),
                translator,
                dispatcher: Arc::clone(&dispatcher),
            };
            let cancel_token = cancel_token.clone();
            workers.spawn(async move { worker.run(cancel_token).await });
        }
        debug!("Started {worker_count} workers");
        WorkerPool {
            workers,
            cancel_token,
        }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Waits for every worker to stop without cancelling them.
    pub async fn join(mut self) {
        while let Some(finished) = self.workers.join_next().await {
            if let Err(e) = finished {
                if e.is_panic() {
                    error!("Worker panicked: {:?}", e);
                }
            }
        }
    }

    /// Cancels the workers, abandoning in-flight deliveries, and waits for them to stop.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        self.join().await;
    }
}

struct Worker {
    id: usize,
    queue: QueueReceiver,
    translator: Translator,
    dispatcher: Arc<dyn SinkDispatcher + Send + Sync>,
}

impl Worker {
    async fn run(self, cancel_token: CancellationToken) {
        loop {
            let envelope = tokio::select! {
                _ = cancel_token.cancelled() => break,
                received = self.queue.recv() => match received {
                    Some(envelope) => envelope,
                    None => break,
                },
            };
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = self.process(envelope) => {},
            }
        }
        debug!("Worker {} stopped", self.id);
    }

    async fn process(&self, envelope: IncomingEnvelope) {
        let canonical = self.translator.translate(&envelope);
        match self.dispatcher.dispatch(&canonical).await {
            Ok(()) => debug!(
                "Worker {} | Event '{}' sent to sink",
                self.id, canonical.message_id
            ),
            Err(e) => error!(
                "Worker {} | Error sending event '{}' to sink, dropping it: {e}",
                self.id, canonical.message_id
            ),
        }
    }
}
