// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reconstructs typed attribute and trait mappings from the flat dynamic keys of an event.
//!
//! Clients flatten their open-ended key/value collections into numbered sibling keys. An
//! attribute named `color` with value `blue` arrives as `"atrk0": "color", "atrv0": "blue"`, and a
//! trait as `"uatrk0"`/`"uatrv0"`. Two encodings are in use:
//!
//! - [`AttributeEncoding::IndexedPairs`]: values are strings and their type is inferred from the
//!   string contents.
//! - [`AttributeEncoding::SelfTyped`]: attribute values are native JSON values that carry a
//!   declared type in a sibling `atrt<i>` key. Trait types are inferred from the JSON kind.
//!
//! Normalization first classifies every raw key into a slot of its numeric index, then pairs the
//! slots. Keys are never looked up by building names, and the raw key order never matters.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::envelope::{TypedMap, TypedValue, ValueType};
use crate::type_inference::{infer_from_json, infer_from_str, satisfies};

const ATTRIBUTE_NAME_PREFIX: &str = "atrk";
const ATTRIBUTE_VALUE_PREFIX: &str = "atrv";
const ATTRIBUTE_TYPE_PREFIX: &str = "atrt";
const TRAIT_NAME_PREFIX: &str = "uatrk";
const TRAIT_VALUE_PREFIX: &str = "uatrv";

/// Wire encoding of the dynamic attribute keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeEncoding {
    /// `atrk<i>`/`atrv<i>` string pairs, type inferred from the string.
    #[default]
    IndexedPairs,
    /// `atrk<i>`/`atrv<i>` with a declared type in `atrt<i>`.
    SelfTyped,
}

impl fmt::Display for AttributeEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeEncoding::IndexedPairs => f.write_str("indexed"),
            AttributeEncoding::SelfTyped => f.write_str("self-typed"),
        }
    }
}

impl FromStr for AttributeEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "indexed" | "indexed-pairs" => Ok(AttributeEncoding::IndexedPairs),
            "self-typed" | "self_typed" | "typed" => Ok(AttributeEncoding::SelfTyped),
            other => Err(format!(
                "Unknown attribute encoding '{other}'. Must be one of: indexed, self-typed"
            )),
        }
    }
}

/// Normalized attributes and traits of one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedFields {
    pub attributes: TypedMap,
    pub traits: TypedMap,
}

impl AttributeEncoding {
    /// Builds the attribute and trait mappings out of the raw dynamic keys.
    pub fn normalize(&self, raw: &Map<String, Value>) -> NormalizedFields {
        let slots = DynamicSlots::classify(raw);
        match self {
            AttributeEncoding::IndexedPairs => NormalizedFields {
                attributes: pair_string_values(&slots.attributes, "attribute"),
                traits: pair_string_values(&slots.traits, "trait"),
            },
            AttributeEncoding::SelfTyped => NormalizedFields {
                attributes: pair_declared_values(&slots.attributes),
                traits: pair_native_values(&slots.traits),
            },
        }
    }
}

/// Numeric suffix of a dynamic key, ordered by numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotIndex<'a>(&'a str);

impl Ord for SlotIndex<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.0.trim_start_matches('0');
        let rhs = other.0.trim_start_matches('0');
        lhs.len()
            .cmp(&rhs.len())
            .then_with(|| lhs.cmp(rhs))
            .then_with(|| self.0.cmp(other.0))
    }
}

impl PartialOrd for SlotIndex<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
struct Slot<'a> {
    name: Option<&'a Value>,
    value: Option<&'a Value>,
    declared_type: Option<&'a Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DynamicKey<'a> {
    AttributeName(SlotIndex<'a>),
    AttributeValue(SlotIndex<'a>),
    AttributeType(SlotIndex<'a>),
    TraitName(SlotIndex<'a>),
    TraitValue(SlotIndex<'a>),
}

impl<'a> DynamicKey<'a> {
    fn parse(key: &'a str) -> Option<Self> {
        // trait prefixes first: they share the "atr" stem with the attribute prefixes
        let candidates: [(&str, fn(SlotIndex<'a>) -> DynamicKey<'a>); 5] = [
            (TRAIT_NAME_PREFIX, DynamicKey::TraitName),
            (TRAIT_VALUE_PREFIX, DynamicKey::TraitValue),
            (ATTRIBUTE_NAME_PREFIX, DynamicKey::AttributeName),
            (ATTRIBUTE_VALUE_PREFIX, DynamicKey::AttributeValue),
            (ATTRIBUTE_TYPE_PREFIX, DynamicKey::AttributeType),
        ];
        candidates.into_iter().find_map(|(prefix, variant)| {
            key.strip_prefix(prefix)
                .filter(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
                .map(|index| variant(SlotIndex(index)))
        })
    }
}

#[derive(Debug, Default)]
struct DynamicSlots<'a> {
    attributes: BTreeMap<SlotIndex<'a>, Slot<'a>>,
    traits: BTreeMap<SlotIndex<'a>, Slot<'a>>,
}

impl<'a> DynamicSlots<'a> {
    fn classify(raw: &'a Map<String, Value>) -> Self {
        let mut slots = DynamicSlots::default();
        for (key, value) in raw {
            match DynamicKey::parse(key) {
                Some(DynamicKey::AttributeName(i)) => {
                    slots.attributes.entry(i).or_default().name = Some(value)
                }
                Some(DynamicKey::AttributeValue(i)) => {
                    slots.attributes.entry(i).or_default().value = Some(value)
                }
                Some(DynamicKey::AttributeType(i)) => {
                    slots.attributes.entry(i).or_default().declared_type = Some(value)
                }
                Some(DynamicKey::TraitName(i)) => {
                    slots.traits.entry(i).or_default().name = Some(value)
                }
                Some(DynamicKey::TraitValue(i)) => {
                    slots.traits.entry(i).or_default().value = Some(value)
                }
                None => {}
            }
        }
        slots
    }
}

/// Yields `(index, name, slot)` for every slot whose name key holds a string.
fn named_slots<'s, 'a>(
    slots: &'s BTreeMap<SlotIndex<'a>, Slot<'a>>,
    kind: &'static str,
) -> impl Iterator<Item = (&'a str, &'a str, &'s Slot<'a>)> + 's {
    slots.iter().filter_map(move |(index, slot)| match slot.name {
        Some(Value::String(name)) => Some((index.0, name.as_str(), slot)),
        Some(other) => {
            debug!("Skipping {kind} {}: name is not a string: {other}", index.0);
            None
        }
        None => None,
    })
}

fn pair_string_values(slots: &BTreeMap<SlotIndex<'_>, Slot<'_>>, kind: &'static str) -> TypedMap {
    let mut typed = TypedMap::new();
    for (index, name, slot) in named_slots(slots, kind) {
        match slot.value {
            Some(Value::String(value)) => {
                let value_type = infer_from_str(value);
                typed.insert(
                    name.to_string(),
                    TypedValue::new(Value::String(value.clone()), value_type),
                );
            }
            Some(other) => debug!("Skipping {kind} '{name}' ({index}): value is not a string: {other}"),
            None => debug!("Skipping {kind} '{name}' ({index}): no value key"),
        }
    }
    typed
}

fn pair_declared_values(slots: &BTreeMap<SlotIndex<'_>, Slot<'_>>) -> TypedMap {
    let mut typed = TypedMap::new();
    for (index, name, slot) in named_slots(slots, "attribute") {
        let declared = match slot.declared_type {
            Some(Value::String(declared)) => declared,
            Some(other) => {
                warn!("Skipping attribute '{name}' ({index}): declared type is not a string: {other}");
                continue;
            }
            None => {
                warn!("Skipping attribute '{name}' ({index}): missing declared type");
                continue;
            }
        };
        let value_type = match declared.parse::<ValueType>() {
            Ok(value_type) => value_type,
            Err(err) => {
                warn!("Skipping attribute '{name}' ({index}): {err}");
                continue;
            }
        };
        let Some(value) = slot.value else {
            debug!("Skipping attribute '{name}' ({index}): no value key");
            continue;
        };
        if !satisfies(value, value_type) {
            warn!("Skipping attribute '{name}' ({index}): value {value} is not a {value_type}");
            continue;
        }
        typed.insert(name.to_string(), TypedValue::new(value.clone(), value_type));
    }
    typed
}

fn pair_native_values(slots: &BTreeMap<SlotIndex<'_>, Slot<'_>>) -> TypedMap {
    let mut typed = TypedMap::new();
    for (index, name, slot) in named_slots(slots, "trait") {
        match slot.value {
            Some(value) => {
                typed.insert(
                    name.to_string(),
                    TypedValue::new(value.clone(), infer_from_json(value)),
                );
            }
            None => debug!("Skipping trait '{name}' ({index}): no value key"),
        }
    }
    typed
}
