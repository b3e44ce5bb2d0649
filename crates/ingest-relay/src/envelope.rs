// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Incoming and canonical event envelopes.
//!
//! An [`IncomingEnvelope`] is decoded from the request body as one JSON object. Its short scalar
//! fields are pulled out by name, and every other top-level key stays in
//! [`IncomingEnvelope::dynamic`], where the attribute normalizer later pairs `atrk<i>`/`atrv<i>`
//! style keys back together. A key repeated in the body keeps its last value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw event as received by the front door.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncomingEnvelope {
    /// `ev`
    pub event: Option<String>,
    /// `et`
    pub event_type: Option<String>,
    /// `id`
    pub app_id: Option<String>,
    /// `uid`
    pub user_id: Option<String>,
    /// `mid`
    pub message_id: Option<String>,
    /// `t`
    pub page_title: Option<String>,
    /// `p`
    pub page_url: Option<String>,
    /// `l`
    pub browser_language: Option<String>,
    /// `sc`
    pub screen_size: Option<String>,
    /// Every key that is not one of the scalar fields above, attributes and traits alike.
    pub dynamic: Map<String, Value>,
}

impl IncomingEnvelope {
    /// Decodes a request body. Anything but a JSON object is rejected, and so is a scalar field
    /// holding something other than a string or `null`.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        let mut dynamic: Map<String, Value> = serde_json::from_slice(body)?;
        Ok(IncomingEnvelope {
            event: take_scalar(&mut dynamic, "ev")?,
            event_type: take_scalar(&mut dynamic, "et")?,
            app_id: take_scalar(&mut dynamic, "id")?,
            user_id: take_scalar(&mut dynamic, "uid")?,
            message_id: take_scalar(&mut dynamic, "mid")?,
            page_title: take_scalar(&mut dynamic, "t")?,
            page_url: take_scalar(&mut dynamic, "p")?,
            browser_language: take_scalar(&mut dynamic, "l")?,
            screen_size: take_scalar(&mut dynamic, "sc")?,
            dynamic,
        })
    }
}

fn take_scalar(fields: &mut Map<String, Value>, key: &str) -> serde_json::Result<Option<String>> {
    match fields.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(other) => Err(de::Error::custom(format!(
            "field `{key}` must be a string, got {other}"
        ))),
    }
}

/// Primitive type tag attached to every normalized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Boolean,
    String,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::Boolean => "boolean",
            ValueType::String => "string",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value type: {0}")]
pub struct UnknownValueType(pub String);

impl FromStr for ValueType {
    type Err = UnknownValueType;

    /// Parses a declared type, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("number") {
            Ok(ValueType::Number)
        } else if s.eq_ignore_ascii_case("boolean") {
            Ok(ValueType::Boolean)
        } else if s.eq_ignore_ascii_case("string") {
            Ok(ValueType::String)
        } else {
            Err(UnknownValueType(s.to_string()))
        }
    }
}

/// A dynamic value paired with its inferred or declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    pub value: Value,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

impl TypedValue {
    pub fn new(value: Value, value_type: ValueType) -> Self {
        TypedValue { value, value_type }
    }
}

/// Name to typed value, serialized in key order.
pub type TypedMap = BTreeMap<String, TypedValue>;

/// The normalized record sent to the sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEnvelope {
    pub event: String,
    pub event_type: String,
    pub app_id: String,
    pub user_id: String,
    pub message_id: String,
    pub page_title: String,
    pub page_url: String,
    pub browser_language: String,
    pub screen_size: String,
    pub attributes: TypedMap,
    pub traits: TypedMap,
}
