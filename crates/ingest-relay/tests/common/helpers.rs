// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helper functions for integration tests

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use ingest_relay::{config::Config, relay::Relay, sink::SinkDispatcher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub const INGEST_PATH: &str = "/receive";

/// A relay serving on a random local port
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub cancel_token: CancellationToken,
    pub handle: JoinHandle<Result<(), ingest_relay::error::RelayError>>,
}

impl RunningRelay {
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Cancels the relay and waits for it to stop
    pub async fn stop(self) {
        self.cancel_token.cancel();
        timeout(Duration::from_secs(2), self.handle)
            .await
            .expect("relay did not stop after cancellation")
            .expect("relay task failed")
            .expect("relay returned an error");
    }
}

pub fn create_test_config(worker_count: usize, queue_capacity: usize) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 1,
        ingest_path: INGEST_PATH.to_string(),
        sink_url: "http://127.0.0.1:1/unused".to_string(),
        worker_count,
        queue_capacity,
        ..Default::default()
    }
}

/// Start the relay in the background on 127.0.0.1 with an OS-assigned port
pub async fn start_relay(
    config: Config,
    dispatcher: Arc<dyn SinkDispatcher + Send + Sync>,
) -> RunningRelay {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind relay listener");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let cancel_token = CancellationToken::new();

    let relay = Relay::new(Arc::new(config), dispatcher);
    let token = cancel_token.clone();
    let handle = tokio::spawn(async move { relay.serve(listener, token).await });

    RunningRelay {
        addr,
        cancel_token,
        handle,
    }
}

/// Send an HTTP request over TCP and return the response
pub async fn send_tcp_request(
    port: u16,
    uri: &str,
    method: &str,
    body: Option<Vec<u8>>,
) -> Result<Response<hyper::body::Incoming>, Box<dyn std::error::Error + Send + Sync>> {
    let stream = timeout(
        Duration::from_secs(2),
        tokio::net::TcpStream::connect(format!("127.0.0.1:{}", port)),
    )
    .await??;

    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut request_builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("Host", format!("127.0.0.1:{}", port))
        .header("Content-Type", "application/json");

    let body_data = body.unwrap_or_default();
    request_builder = request_builder.header("Content-Length", body_data.len().to_string());
    let request = request_builder.body(Full::new(Bytes::from(body_data)))?;

    Ok(sender.send_request(request).await?)
}

/// POST a JSON event to the ingest route
pub async fn post_event(
    port: u16,
    body: &str,
) -> Result<Response<hyper::body::Incoming>, Box<dyn std::error::Error + Send + Sync>> {
    send_tcp_request(port, INGEST_PATH, "POST", Some(body.as_bytes().to_vec())).await
}

pub async fn response_body_string(response: Response<hyper::body::Incoming>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("response body is not utf-8")
}
