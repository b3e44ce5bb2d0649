// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock sink dispatchers for testing

use ingest_relay::{envelope::CanonicalEnvelope, error::DispatchError, sink::SinkDispatcher};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Records every dispatched envelope
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<CanonicalEnvelope>>,
    notify: Notify,
}

impl RecordingDispatcher {
    pub fn sent(&self) -> Vec<CanonicalEnvelope> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `count` envelopes were dispatched
    pub async fn wait_for(&self, count: usize, within: Duration) -> Vec<CanonicalEnvelope> {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.sent.lock().unwrap().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(within, wait)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {count} dispatched events"));
        self.sent()
    }
}

#[async_trait::async_trait]
impl SinkDispatcher for RecordingDispatcher {
    async fn dispatch(&self, envelope: &CanonicalEnvelope) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(envelope.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Accepts envelopes but never completes a delivery
#[derive(Default)]
pub struct BlockingDispatcher {
    started: Mutex<usize>,
    notify: Notify,
}

impl BlockingDispatcher {
    pub fn started(&self) -> usize {
        *self.started.lock().unwrap()
    }

    /// Wait until `count` deliveries are in flight
    pub async fn wait_for_started(&self, count: usize, within: Duration) {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.started() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(within, wait)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {count} deliveries to start"));
    }
}

#[async_trait::async_trait]
impl SinkDispatcher for BlockingDispatcher {
    async fn dispatch(&self, _envelope: &CanonicalEnvelope) -> Result<(), DispatchError> {
        *self.started.lock().unwrap() += 1;
        self.notify.notify_waiters();
        std::future::pending().await
    }
}
