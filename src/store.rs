//! In-memory Schema.org vocabulary store
//!
//! Holds every type and property record keyed by identifier and answers
//! point lookups. The store is built once, validated, and is read-only
//! afterwards, so it can be shared between requests behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::SchemaError;

/// A vocabulary type (class)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub comment: String,
    /// Direct parent types, in declaration order
    #[serde(default)]
    pub sub_type_of: Vec<String>,
    /// Own properties; properties whose domain includes this type are merged in
    #[serde(default)]
    pub properties: Vec<String>,
    /// Set when this node is a value of an enumeration rather than a structural type
    #[serde(default)]
    pub enumeration_type: Option<String>,
    #[serde(default)]
    pub superseded_by: Option<String>,
}

impl TypeNode {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn with_parents(mut self, parents: &[&str]) -> Self {
        self.sub_type_of = parents.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_properties(mut self, properties: &[&str]) -> Self {
        self.properties = properties.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn member_of(mut self, enumeration: &str) -> Self {
        self.enumeration_type = Some(enumeration.to_string());
        self
    }

    /// Parents used when climbing towards the root: declared parents, or the
    /// enumeration type for enumeration values
    pub fn parent_ids(&self) -> Vec<&str> {
        if self.sub_type_of.is_empty() {
            self.enumeration_type.iter().map(String::as_str).collect()
        } else {
            self.sub_type_of.iter().map(String::as_str).collect()
        }
    }
}

/// A vocabulary property (attribute)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyNode {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub sub_property_of: Vec<String>,
    #[serde(default)]
    pub domain_includes: Vec<String>,
    #[serde(default)]
    pub range_includes: Vec<String>,
    #[serde(default)]
    pub inverse_of: Option<String>,
    #[serde(default)]
    pub superseded_by: Option<String>,
}

impl PropertyNode {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            ..Default::default()
        }
    }

    pub fn with_domain(mut self, types: &[&str]) -> Self {
        self.domain_includes = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_range(mut self, types: &[&str]) -> Self {
        self.range_includes = types.iter().map(|t| t.to_string()).collect();
        self
    }
}

/// Serialized form of a vocabulary release
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyData {
    #[serde(default)]
    pub types: Vec<TypeNode>,
    #[serde(default)]
    pub properties: Vec<PropertyNode>,
}

/// Keyed vocabulary with memoized child relations
#[derive(Debug, Clone, Default)]
pub struct VocabularyStore {
    types: HashMap<String, TypeNode>,
    properties: HashMap<String, PropertyNode>,
    /// parent type -> direct subtypes, sorted by id
    subtypes: HashMap<String, Vec<String>>,
    /// enumeration type -> member values, sorted by id
    members: HashMap<String, Vec<String>>,
}

impl VocabularyStore {
    /// Build and validate a store from type and property records
    pub fn new(
        types: impl IntoIterator<Item = TypeNode>,
        properties: impl IntoIterator<Item = PropertyNode>,
    ) -> Result<Self, SchemaError> {
        let mut store = VocabularyStore::default();

        for node in types {
            if node.id.is_empty() {
                return Err(SchemaError::InvalidVocabulary(
                    "type with empty identifier".to_string(),
                ));
            }
            if store.types.contains_key(&node.id) {
                return Err(SchemaError::InvalidVocabulary(format!(
                    "duplicate type '{}'",
                    node.id
                )));
            }
            store.types.insert(node.id.clone(), node);
        }

        for node in properties {
            if node.id.is_empty() {
                return Err(SchemaError::InvalidVocabulary(
                    "property with empty identifier".to_string(),
                ));
            }
            if store.properties.contains_key(&node.id) {
                return Err(SchemaError::InvalidVocabulary(format!(
                    "duplicate property '{}'",
                    node.id
                )));
            }
            store.properties.insert(node.id.clone(), node);
        }

        store.merge_domain_properties();
        store.index_children();
        store.check_acyclic()?;

        Ok(store)
    }

    /// Parse a `{ "types": [...], "properties": [...] }` document
    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let data: VocabularyData = serde_json::from_str(content)?;
        Self::new(data.types, data.properties)
    }

    /// Load a vocabulary document from disk
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        if !path.is_file() {
            return Err(SchemaError::InvalidPath(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| SchemaError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }

    pub fn get_type(&self, id: &str) -> Option<&TypeNode> {
        self.types.get(id)
    }

    pub fn get_property(&self, id: &str) -> Option<&PropertyNode> {
        self.properties.get(id)
    }

    pub fn is_type(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }

    pub fn is_property(&self, id: &str) -> bool {
        self.properties.contains_key(id)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// All type identifiers, sorted
    pub fn type_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.types.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Direct subtypes of a type (memoized, sorted)
    pub(crate) fn subtypes_of(&self, id: &str) -> &[String] {
        self.subtypes.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct enumeration members of a type (memoized, sorted)
    pub(crate) fn members_of(&self, id: &str) -> &[String] {
        self.members.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace a type without validation or reindexing
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, node: TypeNode) {
        self.types.insert(node.id.clone(), node);
    }

    fn merge_domain_properties(&mut self) {
        let mut extra: HashMap<String, BTreeSet<String>> = HashMap::new();
        for property in self.properties.values() {
            for domain in &property.domain_includes {
                extra
                    .entry(domain.clone())
                    .or_default()
                    .insert(property.id.clone());
            }
        }

        for (type_id, props) in extra {
            if let Some(node) = self.types.get_mut(&type_id) {
                for prop in props {
                    if !node.properties.contains(&prop) {
                        node.properties.push(prop);
                    }
                }
            }
        }
    }

    fn index_children(&mut self) {
        self.subtypes.clear();
        self.members.clear();

        for node in self.types.values() {
            for parent in &node.sub_type_of {
                self.subtypes
                    .entry(parent.clone())
                    .or_default()
                    .push(node.id.clone());
            }
            if let Some(enumeration) = &node.enumeration_type {
                self.members
                    .entry(enumeration.clone())
                    .or_default()
                    .push(node.id.clone());
            }
        }

        for children in self.subtypes.values_mut().chain(self.members.values_mut()) {
            children.sort();
            children.dedup();
        }
    }

    /// Reject parent graphs where a type reaches itself
    fn check_acyclic(&self) -> Result<(), SchemaError> {
        let mut done: HashSet<&str> = HashSet::new();

        for id in self.type_ids() {
            let mut on_path: Vec<&str> = Vec::new();
            self.visit_parents(id, &mut on_path, &mut done)?;
        }
        Ok(())
    }

    fn visit_parents<'a>(
        &'a self,
        id: &'a str,
        on_path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), SchemaError> {
        if done.contains(id) {
            return Ok(());
        }
        if on_path.contains(&id) {
            return Err(SchemaError::CyclicHierarchy(id.to_string()));
        }
        let Some(node) = self.types.get(id) else {
            return Ok(());
        };

        on_path.push(id);
        for parent in node.parent_ids() {
            self.visit_parents(parent, on_path, done)?;
        }
        on_path.pop();
        done.insert(id);
        Ok(())
    }
}
