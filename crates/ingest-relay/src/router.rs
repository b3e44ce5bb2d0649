// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The HTTP front door.
//!
//! [`IngestRouter`] owns the only route of the relay. It decodes the body, hands the envelope to
//! the ingestion queue and acknowledges right away; delivery to the sink happens later on a
//! worker and its outcome is never reported back to the caller.

use std::fmt::Display;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::{http, Method, Request, StatusCode};
use tracing::debug;

use crate::envelope::IncomingEnvelope;
use crate::http_utils::{log_and_create_http_response, verify_request_content_length, HttpResponse};
use crate::queue::QueueSender;

pub const ACCEPTED_MESSAGE: &str = "Request Received and sent to worker";
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid Request Format";

#[derive(Clone)]
pub struct IngestRouter {
    ingest_path: Arc<str>,
    max_request_content_length: usize,
    queue: QueueSender,
}

impl IngestRouter {
    pub fn new(
        ingest_path: impl Into<Arc<str>>,
        max_request_content_length: usize,
        queue: QueueSender,
    ) -> Self {
        IngestRouter {
            ingest_path: ingest_path.into(),
            max_request_content_length,
            queue,
        }
    }

    pub fn ingest_path(&self) -> &str {
        &self.ingest_path
    }

    /// Called for each HTTP request.
    pub async fn route<B>(&self, req: Request<B>) -> http::Result<HttpResponse>
    where
        B: hyper::body::Body,
        B::Error: Display,
    {
        if req.uri().path() != &*self.ingest_path {
            return log_and_create_http_response(
                &format!("No route for {}", req.uri().path()),
                StatusCode::NOT_FOUND,
            );
        }
        if req.method() != Method::POST {
            return log_and_create_http_response(
                &format!("Method {} not allowed on {}", req.method(), self.ingest_path),
                StatusCode::METHOD_NOT_ALLOWED,
            );
        }
        self.ingest(req).await
    }

    async fn ingest<B>(&self, req: Request<B>) -> http::Result<HttpResponse>
    where
        B: hyper::body::Body,
        B::Error: Display,
    {
        let (parts, body) = req.into_parts();
        if let Some(response) = verify_request_content_length(
            &parts.headers,
            self.max_request_content_length,
            "Error processing event",
        ) {
            return response;
        }

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error reading request body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };
        if body.len() > self.max_request_content_length {
            return log_and_create_http_response(
                "Error processing event: Payload too large",
                StatusCode::PAYLOAD_TOO_LARGE,
            );
        }

        let envelope = match IncomingEnvelope::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("Rejecting event: {e}");
                return log_and_create_http_response(
                    INVALID_REQUEST_MESSAGE,
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        match self.queue.enqueue(envelope).await {
            Ok(()) => log_and_create_http_response(ACCEPTED_MESSAGE, StatusCode::OK),
            Err(e) => log_and_create_http_response(
                &format!("Error enqueuing event: {e}"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        }
    }
}
