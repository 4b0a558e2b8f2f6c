//! in-memory host backed by a JSON model snapshot

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{
    AttrValue, AttributeAccessor, AttributeHandle, Category, ClassificationReader, ElementId,
    EntityPopulation, StorageKind, WorksetId, WorksetTable, WriteError,
};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse model file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write model file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize model: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workset {
    pub id: WorksetId,
    pub name: String,
}

/// a writable attribute slot on an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AttributeRecord", into = "AttributeRecord")]
pub struct Attribute {
    pub storage: StorageKind,
    pub value: Option<AttrValue>,
    pub read_only: bool,
    /// when non-empty, writes outside this list are rejected by the host
    pub allowed: Vec<String>,
}

impl Attribute {
    pub fn new(storage: StorageKind) -> Self {
        Self {
            storage,
            value: None,
            read_only: false,
            allowed: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: AttrValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_allowed(mut self, allowed: &[&str]) -> Self {
        self.allowed = allowed.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// on-disk shape of an attribute; the value is typed by `storage`
#[derive(Serialize, Deserialize)]
struct AttributeRecord {
    storage: StorageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    read_only: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    allowed: Vec<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl TryFrom<AttributeRecord> for Attribute {
    type Error = String;

    fn try_from(record: AttributeRecord) -> Result<Self, Self::Error> {
        let value = match record.value {
            None | Some(serde_json::Value::Null) => None,
            Some(json) => Some(typed_value(record.storage, &json)?),
        };

        Ok(Self {
            storage: record.storage,
            value,
            read_only: record.read_only,
            allowed: record.allowed,
        })
    }
}

impl From<Attribute> for AttributeRecord {
    fn from(attribute: Attribute) -> Self {
        let value = attribute.value.map(|v| match v {
            AttrValue::Integer(n) => serde_json::Value::from(n),
            AttrValue::Double(n) => serde_json::Value::from(n),
            AttrValue::Text(s) => serde_json::Value::from(s),
            AttrValue::Reference(id) => serde_json::Value::from(id.0),
        });

        Self {
            storage: attribute.storage,
            value,
            read_only: attribute.read_only,
            allowed: attribute.allowed,
        }
    }
}

fn typed_value(storage: StorageKind, json: &serde_json::Value) -> Result<AttrValue, String> {
    match storage {
        StorageKind::Integer => json
            .as_i64()
            .map(AttrValue::Integer)
            .ok_or_else(|| format!("expected integer value, got {}", json)),
        StorageKind::Double => json
            .as_f64()
            .map(AttrValue::Double)
            .ok_or_else(|| format!("expected number value, got {}", json)),
        StorageKind::String => json
            .as_str()
            .map(|s| AttrValue::Text(s.to_string()))
            .ok_or_else(|| format!("expected string value, got {}", json)),
        StorageKind::ElementId => json
            .as_i64()
            .map(|n| AttrValue::Reference(ElementId(n)))
            .ok_or_else(|| format!("expected element id, got {}", json)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workset: Option<WorksetId>,
    /// type definitions are never part of the rule population
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_type: bool,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl Element {
    pub fn new(id: i64) -> Self {
        Self {
            id: ElementId(id),
            category: None,
            name: None,
            family: None,
            type_name: None,
            workset: None,
            is_type: false,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_family(mut self, family: &str) -> Self {
        self.family = Some(family.to_string());
        self
    }

    pub fn with_type_name(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    pub fn with_workset(mut self, workset: i64) -> Self {
        self.workset = Some(WorksetId(workset));
        self
    }

    pub fn as_type(mut self) -> Self {
        self.is_type = true;
        self
    }

    pub fn with_attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }
}

/// element snapshot implementing every host capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelRecord", into = "ModelRecord")]
pub struct Model {
    elements: Vec<Element>,
    worksets: Vec<Workset>,
    /// element id -> position in `elements`
    index: BTreeMap<ElementId, usize>,
    workset_names: BTreeMap<WorksetId, String>,
}

/// on-disk shape of a model; lookup tables are rebuilt on load
#[derive(Serialize, Deserialize)]
struct ModelRecord {
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    worksets: Vec<Workset>,
}

impl TryFrom<ModelRecord> for Model {
    type Error = String;

    fn try_from(record: ModelRecord) -> Result<Self, Self::Error> {
        let mut seen = BTreeSet::new();
        if let Some(duplicate) = record.elements.iter().find(|e| !seen.insert(e.id)) {
            return Err(format!("duplicate element id {}", duplicate.id));
        }

        let mut model = Self::new(record.elements);
        for workset in record.worksets {
            model.push_workset(workset);
        }
        Ok(model)
    }
}

impl From<Model> for ModelRecord {
    fn from(model: Model) -> Self {
        Self {
            elements: model.elements,
            worksets: model.worksets,
        }
    }
}

impl Model {
    /// build a model; when ids repeat, lookups resolve to the first element
    pub fn new(elements: Vec<Element>) -> Self {
        let mut index = BTreeMap::new();
        for (position, element) in elements.iter().enumerate() {
            index.entry(element.id).or_insert(position);
        }

        Self {
            elements,
            worksets: Vec::new(),
            index,
            workset_names: BTreeMap::new(),
        }
    }

    pub fn with_workset(mut self, id: i64, name: &str) -> Self {
        self.push_workset(Workset {
            id: WorksetId(id),
            name: name.to_string(),
        });
        self
    }

    fn push_workset(&mut self, workset: Workset) {
        self.workset_names
            .entry(workset.id)
            .or_insert_with(|| workset.name.clone());
        self.worksets.push(workset);
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path).map_err(|source| ModelError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// write the snapshot atomically (temp file, then rename)
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let content = serde_json::to_string_pretty(self)?;
        let write_err = |source| ModelError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(write_err)?;
        fs::rename(&temp_path, path).map_err(write_err)?;

        Ok(())
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(*self.index.get(&id)?)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        let position = *self.index.get(&id)?;
        self.elements.get_mut(position)
    }

    /// current value of one attribute, for inspection after a run
    pub fn value(&self, id: ElementId, name: &str) -> Option<&AttrValue> {
        self.element(id)?.attributes.get(name)?.value.as_ref()
    }
}

impl EntityPopulation for Model {
    fn instances(&self) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|e| !e.is_type)
            .map(|e| e.id)
            .collect()
    }

    fn instances_of_category(&self, category: Category) -> Vec<ElementId> {
        self.elements
            .iter()
            .filter(|e| !e.is_type && e.category == Some(category))
            .map(|e| e.id)
            .collect()
    }
}

impl ClassificationReader for Model {
    fn category(&self, id: ElementId) -> Option<Category> {
        self.element(id)?.category
    }

    fn name(&self, id: ElementId) -> Option<String> {
        self.element(id)?.name.clone()
    }

    fn family_name(&self, id: ElementId) -> Option<String> {
        self.element(id)?.family.clone()
    }

    fn type_name(&self, id: ElementId) -> Option<String> {
        self.element(id)?.type_name.clone()
    }

    fn workset_id(&self, id: ElementId) -> Option<WorksetId> {
        self.element(id)?.workset
    }
}

impl WorksetTable for Model {
    fn workset_name(&self, id: WorksetId) -> Option<String> {
        self.workset_names.get(&id).cloned()
    }
}

impl AttributeAccessor for Model {
    fn attribute(&self, id: ElementId, name: &str) -> Option<AttributeHandle> {
        let attribute = self.element(id)?.attributes.get(name)?;
        Some(AttributeHandle {
            storage: attribute.storage,
            read_only: attribute.read_only,
        })
    }

    fn read(&self, id: ElementId, name: &str) -> Option<AttrValue> {
        self.value(id, name).cloned()
    }

    fn write(&mut self, id: ElementId, name: &str, value: AttrValue) -> Result<(), WriteError> {
        let element = self
            .element_mut(id)
            .ok_or_else(|| WriteError::new(format!("element {} not found", id)))?;

        let attribute = element
            .attributes
            .get_mut(name)
            .ok_or_else(|| WriteError::new(format!("attribute '{}' not found", name)))?;

        if attribute.read_only {
            return Err(WriteError::new(format!("attribute '{}' is read-only", name)));
        }

        if value.storage() != attribute.storage {
            return Err(WriteError::new(format!(
                "attribute '{}' stores {}, got {}",
                name,
                attribute.storage,
                value.storage()
            )));
        }

        if !attribute.allowed.is_empty() {
            let text = value.to_string();
            if !attribute.allowed.iter().any(|a| *a == text) {
                return Err(WriteError::new(format!(
                    "value '{}' is not allowed for '{}' (allowed: {})",
                    text,
                    name,
                    attribute.allowed.join(", ")
                )));
            }
        }

        attribute.value = Some(value);
        Ok(())
    }
}
