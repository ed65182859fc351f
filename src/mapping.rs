//! Schema.org mappings for content types
//!
//! A mapping binds an entity type/bundle to a vocabulary type and lists,
//! in order, which record field feeds which vocabulary property.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One field -> property binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyBinding {
    pub field: String,
    pub property: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub entity_type: String,
    pub bundle: String,
    pub schema_type: String,
    /// Records may narrow `schema_type` through their subtype field
    #[serde(default)]
    pub subtype: bool,
    #[serde(default)]
    pub properties: Vec<PropertyBinding>,
}

impl Mapping {
    pub fn new(
        entity_type: impl Into<String>,
        bundle: impl Into<String>,
        schema_type: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            schema_type: schema_type.into(),
            subtype: false,
            properties: Vec::new(),
        }
    }

    pub fn with_subtype(mut self) -> Self {
        self.subtype = true;
        self
    }

    pub fn bind(mut self, field: impl Into<String>, property: impl Into<String>) -> Self {
        self.properties.push(PropertyBinding {
            field: field.into(),
            property: property.into(),
        });
        self
    }
}

/// Read-only lookup of mappings
pub trait MappingRegistry: Send + Sync {
    fn mapping_for(&self, entity_type: &str, bundle: &str) -> Option<&Mapping>;

    /// Ordered (field, property) pairs of a mapping
    fn field_bindings<'m>(&self, mapping: &'m Mapping) -> Vec<(&'m str, &'m str)> {
        mapping
            .properties
            .iter()
            .map(|b| (b.field.as_str(), b.property.as_str()))
            .collect()
    }

    fn is_mapped(&self, entity_type: &str, bundle: &str) -> bool {
        self.mapping_for(entity_type, bundle).is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMappingRegistry {
    mappings: HashMap<(String, String), Mapping>,
}

impl InMemoryMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the mapping of an entity type/bundle
    pub fn insert(&mut self, mapping: Mapping) {
        self.mappings.insert(
            (mapping.entity_type.clone(), mapping.bundle.clone()),
            mapping,
        );
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl FromIterator<Mapping> for InMemoryMappingRegistry {
    fn from_iter<I: IntoIterator<Item = Mapping>>(iter: I) -> Self {
        let mut registry = Self::new();
        for mapping in iter {
            registry.insert(mapping);
        }
        registry
    }
}

impl MappingRegistry for InMemoryMappingRegistry {
    fn mapping_for(&self, entity_type: &str, bundle: &str) -> Option<&Mapping> {
        self.mappings
            .get(&(entity_type.to_string(), bundle.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_bindings_keep_order() {
        let mapping = Mapping::new("node", "person", "Person")
            .bind("title", "name")
            .bind("alt_names", "alternateName")
            .bind("body", "description");
        let registry: InMemoryMappingRegistry = vec![mapping].into_iter().collect();

        let mapping = registry.mapping_for("node", "person").unwrap();
        let bindings = registry.field_bindings(mapping);
        assert_eq!(
            bindings,
            vec![
                ("title", "name"),
                ("alt_names", "alternateName"),
                ("body", "description")
            ]
        );
    }

    #[test]
    fn test_unmapped_bundle() {
        let registry: InMemoryMappingRegistry =
            vec![Mapping::new("node", "event", "Event")].into_iter().collect();
        assert!(registry.is_mapped("node", "event"));
        assert!(!registry.is_mapped("node", "page"));
        assert!(registry.mapping_for("user", "event").is_none());
    }

    #[test]
    fn test_mapping_deserialize() {
        let mapping: Mapping = serde_json::from_value(json!({
            "entity_type": "node",
            "bundle": "place",
            "schema_type": "Place",
            "subtype": true,
            "properties": [{"field": "title", "property": "name"}]
        }))
        .unwrap();
        assert!(mapping.subtype);
        assert_eq!(mapping.properties[0].property, "name");
    }
}
