// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded handoff between request handlers and workers.
//!
//! Handlers share a [`QueueSender`]; workers share a [`QueueReceiver`]. A full queue suspends
//! [`QueueSender::enqueue`], which is how backpressure reaches HTTP clients. The queue closes once
//! every sender is dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::envelope::IncomingEnvelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("ingestion queue is closed")]
pub struct QueueClosed;

#[derive(Debug, Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<IncomingEnvelope>,
}

impl QueueSender {
    /// Waits for a free slot, then hands the envelope over.
    pub async fn enqueue(&self, envelope: IncomingEnvelope) -> Result<(), QueueClosed> {
        self.tx.send(envelope).await.map_err(|_| QueueClosed)
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer side, cloned into every worker. Workers take turns waiting on the channel.
#[derive(Debug, Clone)]
pub struct QueueReceiver {
    rx: Arc<Mutex<mpsc::Receiver<IncomingEnvelope>>>,
}

impl QueueReceiver {
    /// Next envelope, or `None` once the queue is closed and drained.
    pub async fn recv(&self) -> Option<IncomingEnvelope> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

/// Creates a queue holding at most `capacity` envelopes. A zero capacity is raised to one.
pub fn ingestion_queue(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        QueueSender { tx },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}
