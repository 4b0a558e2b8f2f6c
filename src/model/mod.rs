//! element model seen by the rule engine
//!
//! the engine never owns elements. it reads classifications and writes
//! attributes through the capability traits below, which the host implements.
//! [`Model`] is an in-memory host backed by a JSON snapshot.

mod category;
mod memory;

pub use category::Category;
pub use memory::{Attribute, Element, Model, ModelError, Workset};

use std::fmt;

use serde::{Deserialize, Serialize};

/// stable element identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub i64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// key into the host's workset side table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorksetId(pub i64);

/// native storage kind of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Integer,
    Double,
    String,
    ElementId,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Integer => write!(f, "integer"),
            StorageKind::Double => write!(f, "double"),
            StorageKind::String => write!(f, "string"),
            StorageKind::ElementId => write!(f, "element_id"),
        }
    }
}

/// a value as stored in an attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Integer(i64),
    Double(f64),
    Text(String),
    Reference(ElementId),
}

impl AttrValue {
    /// storage kind able to hold this value
    pub fn storage(&self) -> StorageKind {
        match self {
            AttrValue::Integer(_) => StorageKind::Integer,
            AttrValue::Double(_) => StorageKind::Double,
            AttrValue::Text(_) => StorageKind::String,
            AttrValue::Reference(_) => StorageKind::ElementId,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Integer(n) => write!(f, "{}", n),
            AttrValue::Double(n) => write!(f, "{}", n),
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::Reference(id) => write!(f, "{}", id),
        }
    }
}

/// what the engine can learn about an attribute before writing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeHandle {
    pub storage: StorageKind,
    pub read_only: bool,
}

/// failure reported by the host when a write is rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct WriteError {
    pub message: String,
}

impl WriteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// enumerates the elements rules are evaluated over
pub trait EntityPopulation {
    /// every instance element, type definitions excluded
    fn instances(&self) -> Vec<ElementId>;

    /// every instance element of one category, regardless of any working set
    fn instances_of_category(&self, category: Category) -> Vec<ElementId>;
}

/// per-element classification accessors
pub trait ClassificationReader {
    fn category(&self, id: ElementId) -> Option<Category>;
    fn name(&self, id: ElementId) -> Option<String>;
    fn family_name(&self, id: ElementId) -> Option<String>;
    fn type_name(&self, id: ElementId) -> Option<String>;
    fn workset_id(&self, id: ElementId) -> Option<WorksetId>;
}

/// side table resolving workset ids to names
pub trait WorksetTable {
    fn workset_name(&self, id: WorksetId) -> Option<String>;
}

/// named attribute lookup and writes
pub trait AttributeAccessor {
    fn attribute(&self, id: ElementId, name: &str) -> Option<AttributeHandle>;

    /// current value, `None` when the attribute is absent or has no value
    fn read(&self, id: ElementId, name: &str) -> Option<AttrValue>;

    fn write(&mut self, id: ElementId, name: &str, value: AttrValue) -> Result<(), WriteError>;
}

/// everything the engine needs from its host
pub trait Host: EntityPopulation + ClassificationReader + WorksetTable + AttributeAccessor {}

impl<T> Host for T where T: EntityPopulation + ClassificationReader + WorksetTable + AttributeAccessor
{}
