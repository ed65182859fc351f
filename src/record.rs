//! Content records and the collaborators that load and guard them
//!
//! A record is an entity of some type/bundle carrying named fields. Field
//! items are kept as raw JSON values; the value-shape tag on the field tells
//! the resolver how to read them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Declared number of values a field may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Cardinality {
    Limited(u32),
    Unbounded,
}

impl Cardinality {
    pub fn is_single(&self) -> bool {
        matches!(self, Cardinality::Limited(1))
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Cardinality::Limited(1)
    }
}

/// Non-positive values mean unbounded
impl From<i64> for Cardinality {
    fn from(value: i64) -> Self {
        if value <= 0 {
            Cardinality::Unbounded
        } else {
            Cardinality::Limited(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }
}

impl From<Cardinality> for i64 {
    fn from(value: Cardinality) -> Self {
        match value {
            Cardinality::Limited(n) => i64::from(n),
            Cardinality::Unbounded => -1,
        }
    }
}

/// Identity of a record: entity type plus id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordRef {
    pub entity_type: String,
    pub id: String,
}

impl RecordRef {
    pub fn new(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Parse "node/1"
    pub fn parse(route: &str) -> Option<Self> {
        let (entity_type, id) = route.trim_matches('/').split_once('/')?;
        if entity_type.is_empty() || id.is_empty() || id.contains('/') {
            return None;
        }
        Some(Self::new(entity_type, id))
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.id)
    }
}

/// One field of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Value-shape tag selecting a resolver strategy (e.g. "string", "address")
    #[serde(rename = "type")]
    pub shape: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Default entity type for reference items that do not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    #[serde(default)]
    pub items: Vec<Value>,
}

impl Field {
    pub fn new(name: impl Into<String>, shape: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape: shape.into(),
            cardinality: Cardinality::default(),
            target_type: None,
            items: Vec::new(),
        }
    }

    pub fn unbounded(mut self) -> Self {
        self.cardinality = Cardinality::Unbounded;
        self
    }

    pub fn with_items(mut self, items: Vec<Value>) -> Self {
        self.items = items;
        self
    }

    pub fn with_target_type(mut self, entity_type: impl Into<String>) -> Self {
        self.target_type = Some(entity_type.into());
        self
    }
}

/// A typed content record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub entity_type: String,
    pub bundle: String,
    pub id: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub label: String,
    /// Public canonical URL, if the record has one
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl ContentRecord {
    pub fn new(entity_type: impl Into<String>, bundle: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            id: id.into(),
            uuid: None,
            label: String::new(),
            url: None,
            fields: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn reference(&self) -> RecordRef {
        RecordRef::new(self.entity_type.clone(), self.id.clone())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First item of a field, read through its main property
    pub fn first_value(&self, name: &str) -> Option<&Value> {
        self.field(name)
            .and_then(|f| f.items.first())
            .map(main_value)
    }
}

/// Main property of a field item: `value` for object items, the item itself otherwise
pub fn main_value(item: &Value) -> &Value {
    match item {
        Value::Object(obj) => obj.get("value").unwrap_or(item),
        _ => item,
    }
}

/// Read the target of a reference item (`{"target_type", "target_id"}` or a bare id)
pub fn reference_target(item: &Value, default_type: Option<&str>) -> Option<RecordRef> {
    let scalar_id = |v: &Value| match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    match item {
        Value::Object(obj) => {
            let id = obj.get("target_id").and_then(scalar_id)?;
            let entity_type = obj
                .get("target_type")
                .and_then(Value::as_str)
                .or(default_type)?;
            Some(RecordRef::new(entity_type, id))
        }
        other => Some(RecordRef::new(default_type?, scalar_id(other)?)),
    }
}

/// Loads records by reference
pub trait RecordStore: Send + Sync {
    fn load(&self, reference: &RecordRef) -> Option<&ContentRecord>;
}

/// Record store backed by a hash map
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: HashMap<RecordRef, ContentRecord>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: ContentRecord) {
        self.records.insert(record.reference(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<ContentRecord> for InMemoryRecordStore {
    fn from_iter<I: IntoIterator<Item = ContentRecord>>(iter: I) -> Self {
        let mut store = Self::new();
        for record in iter {
            store.insert(record);
        }
        store
    }
}

impl RecordStore for InMemoryRecordStore {
    fn load(&self, reference: &RecordRef) -> Option<&ContentRecord> {
        self.records.get(reference)
    }
}

/// Read permissions of the current viewer
pub trait AccessPolicy: Send + Sync {
    fn can_view(&self, record: &ContentRecord) -> bool;

    fn can_view_field(&self, _record: &ContentRecord, _field: &str) -> bool {
        true
    }
}

/// A viewer allowed to see everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn can_view(&self, _record: &ContentRecord) -> bool {
        true
    }
}
