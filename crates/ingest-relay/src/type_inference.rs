// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;

use crate::envelope::ValueType;

/// Infers the type of a string-encoded value.
///
/// Surrounding `"` characters are stripped first. A value that parses as a 64-bit float is a
/// `number`; otherwise `true`/`false` (any ASCII case) is a `boolean`; anything else is a
/// `string`.
pub fn infer_from_str(raw: &str) -> ValueType {
    let trimmed = raw.trim_matches('"');
    if trimmed.parse::<f64>().is_ok() {
        return ValueType::Number;
    }
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return ValueType::Boolean;
    }
    ValueType::String
}

/// Infers the type of a native JSON value from its kind.
pub fn infer_from_json(value: &Value) -> ValueType {
    match value {
        Value::Number(_) => ValueType::Number,
        Value::Bool(_) => ValueType::Boolean,
        _ => ValueType::String,
    }
}

/// Whether `value` can carry the declared type `declared`.
///
/// Native JSON kinds must match, and string-encoded values must parse the way
/// [`infer_from_str`] would parse them. Every value satisfies `string`.
pub fn satisfies(value: &Value, declared: ValueType) -> bool {
    match declared {
        ValueType::String => true,
        ValueType::Number => match value {
            Value::Number(_) => true,
            Value::String(s) => infer_from_str(s) == ValueType::Number,
            _ => false,
        },
        ValueType::Boolean => match value {
            Value::Bool(_) => true,
            Value::String(s) => infer_from_str(s) == ValueType::Boolean,
            _ => false,
        },
    }
}
