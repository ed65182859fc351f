//! Site fixtures
//!
//! A site document bundles a vocabulary, the mappings and the content
//! records in one JSON file, which is what the CLI serializes from.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::config::JsonLdOptions;
use crate::error::SchemaError;
use crate::mapping::{InMemoryMappingRegistry, Mapping};
use crate::record::{ContentRecord, InMemoryRecordStore};
use crate::serialize::EntitySerializer;
use crate::store::{VocabularyData, VocabularyStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteData {
    #[serde(default)]
    pub vocabulary: VocabularyData,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    #[serde(default)]
    pub records: Vec<ContentRecord>,
}

/// Loaded, validated site
#[derive(Debug, Clone)]
pub struct Site {
    pub vocabulary: Arc<VocabularyStore>,
    pub mappings: Arc<InMemoryMappingRegistry>,
    pub records: Arc<InMemoryRecordStore>,
}

impl Site {
    pub fn from_data(data: SiteData) -> Result<Self, SchemaError> {
        let vocabulary = VocabularyStore::new(data.vocabulary.types, data.vocabulary.properties)?;

        for mapping in &data.mappings {
            if !vocabulary.is_type(&mapping.schema_type) {
                warn!(
                    "Mapping {}.{} targets unknown type '{}'",
                    mapping.entity_type, mapping.bundle, mapping.schema_type
                );
            }
            for binding in &mapping.properties {
                if !vocabulary.is_property(&binding.property) {
                    warn!(
                        "Mapping {}.{} binds '{}' to unknown property '{}'",
                        mapping.entity_type, mapping.bundle, binding.field, binding.property
                    );
                }
            }
        }

        Ok(Self {
            vocabulary: Arc::new(vocabulary),
            mappings: Arc::new(data.mappings.into_iter().collect()),
            records: Arc::new(data.records.into_iter().collect()),
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let data: SiteData = serde_json::from_str(content)?;
        Self::from_data(data)
    }

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

    /// A serializer over this site's stores
    pub fn serializer(&self, options: JsonLdOptions) -> EntitySerializer {
        EntitySerializer::new(
            self.vocabulary.clone(),
            self.mappings.clone(),
            self.records.clone(),
        )
        .with_options(options)
    }
}
