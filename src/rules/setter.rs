//! attribute setter
//!
//! coerces a raw value to an attribute's storage kind and writes it. the
//! coercion table is ordered; the first branch whose storage kind matches and
//! whose value interpretation succeeds wins. nothing escapes this module as an
//! error: every failure becomes a [`SetOutcome`].

use std::fmt;

use serde::Serialize;

use super::predicate::exists_literal;
use crate::model::{AttrValue, AttributeAccessor, ElementId, StorageKind};

/// a value to write, before coercion
///
/// values read from rule tables are `Text`; a text value qualifies as a
/// boolean literal, integer or float when its syntax allows, and always as a
/// string
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    Reference(ElementId),
}

impl RawValue {
    /// "true"/"false" (case-insensitive) or a typed bool
    pub fn as_bool_literal(&self) -> Option<bool> {
        match self {
            RawValue::Text(s) => exists_literal(s),
            RawValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::Text(s) => s.trim().parse().ok(),
            RawValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// integers widen to floats; non-finite text is rejected
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            RawValue::Float(f) => Some(*f),
            RawValue::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ElementId> {
        match self {
            RawValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => write!(f, "{}", s),
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Integer(n) => write!(f, "{}", n),
            RawValue::Float(n) => write!(f, "{}", n),
            RawValue::Reference(id) => write!(f, "#{}", id),
        }
    }
}

/// one branch of the coercion table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Coercion {
    BoolToInteger,
    IntegerToInteger,
    FloatToDouble,
    IntegerToReference,
    ReferenceToReference,
    ReferenceToInteger,
    ReferenceToString,
    StringToString,
}

impl Coercion {
    /// branches in precedence order
    pub const ORDER: [Coercion; 8] = [
        Coercion::BoolToInteger,
        Coercion::IntegerToInteger,
        Coercion::FloatToDouble,
        Coercion::IntegerToReference,
        Coercion::ReferenceToReference,
        Coercion::ReferenceToInteger,
        Coercion::ReferenceToString,
        Coercion::StringToString,
    ];

    /// storage kind this branch writes to
    pub fn storage(&self) -> StorageKind {
        match self {
            Coercion::BoolToInteger | Coercion::IntegerToInteger | Coercion::ReferenceToInteger => {
                StorageKind::Integer
            }
            Coercion::FloatToDouble => StorageKind::Double,
            Coercion::IntegerToReference | Coercion::ReferenceToReference => StorageKind::ElementId,
            Coercion::ReferenceToString | Coercion::StringToString => StorageKind::String,
        }
    }

    /// the stored value, if `value` has the kind this branch reads
    pub fn apply(&self, value: &RawValue) -> Option<AttrValue> {
        match self {
            Coercion::BoolToInteger => value
                .as_bool_literal()
                .map(|b| AttrValue::Integer(i64::from(b))),
            Coercion::IntegerToInteger => value.as_integer().map(AttrValue::Integer),
            Coercion::FloatToDouble => value.as_float().map(AttrValue::Double),
            Coercion::IntegerToReference => value
                .as_integer()
                .map(|n| AttrValue::Reference(ElementId(n))),
            Coercion::ReferenceToReference => value.as_reference().map(AttrValue::Reference),
            Coercion::ReferenceToInteger => value.as_reference().map(|id| AttrValue::Integer(id.0)),
            Coercion::ReferenceToString => value
                .as_reference()
                .map(|id| AttrValue::Text(id.0.to_string())),
            Coercion::StringToString => value.as_text().map(|s| AttrValue::Text(s.to_string())),
        }
    }
}

/// pick the first applicable branch for a storage kind
pub fn coerce(storage: StorageKind, value: &RawValue) -> Option<(Coercion, AttrValue)> {
    Coercion::ORDER
        .iter()
        .filter(|c| c.storage() == storage)
        .find_map(|c| c.apply(value).map(|v| (*c, v)))
}

/// result of one attribute write attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SetOutcome {
    Written { coercion: Coercion, value: AttrValue },
    /// attribute not present on the element
    Missing,
    ReadOnly,
    /// no coercion branch for this storage kind and value
    Incompatible { storage: StorageKind },
    /// host rejected the write
    Failed { message: String },
}

/// coerce `value` and write it to attribute `name` of element `id`
pub fn set_attribute<A>(host: &mut A, id: ElementId, name: &str, value: &RawValue) -> SetOutcome
where
    A: AttributeAccessor + ?Sized,
{
    let Some(handle) = host.attribute(id, name) else {
        return SetOutcome::Missing;
    };

    if handle.read_only {
        return SetOutcome::ReadOnly;
    }

    let Some((coercion, coerced)) = coerce(handle.storage, value) else {
        return SetOutcome::Incompatible {
            storage: handle.storage,
        };
    };

    match host.write(id, name, coerced.clone()) {
        Ok(()) => SetOutcome::Written {
            coercion,
            value: coerced,
        },
        Err(e) => SetOutcome::Failed { message: e.message },
    }
}
