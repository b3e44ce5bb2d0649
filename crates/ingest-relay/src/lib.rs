// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod envelope;
pub mod error;
pub mod http_utils;
pub mod normalizer;
pub mod queue;
pub mod relay;
pub mod router;
pub mod sink;
pub mod translator;
pub mod type_inference;
pub mod worker_pool;
