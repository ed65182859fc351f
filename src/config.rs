//! JSON-LD output settings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use url::Url;

use crate::error::SchemaError;

/// Where an injected identifier value comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierSource {
    /// `propertyID` of the emitted `PropertyValue`
    pub property_id: String,
    /// Record field holding the value; `None` reads the record's uuid
    #[serde(default)]
    pub field: Option<String>,
}

impl IdentifierSource {
    pub fn uuid() -> Self {
        Self {
            property_id: "uuid".to_string(),
            field: None,
        }
    }
}

/// Options for serialization and assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonLdOptions {
    /// Properties emitted first, in this order; the rest follow alphabetically
    pub property_order: Vec<String>,
    /// Property -> image style whose derivative URL replaces the raw file URL
    pub image_styles: BTreeMap<String, String>,
    pub identifiers: Vec<IdentifierSource>,
    /// Absolute base for relative file and link URLs
    pub base_url: Option<String>,
    /// Offset applied to emitted date/time values
    pub utc_offset_seconds: i32,
    /// Maximum nesting of referenced records
    pub max_depth: usize,
}

impl Default for JsonLdOptions {
    fn default() -> Self {
        Self {
            property_order: Vec::new(),
            image_styles: BTreeMap::new(),
            identifiers: vec![IdentifierSource::uuid()],
            base_url: None,
            utc_offset_seconds: 0,
            max_depth: 8,
        }
    }
}

impl JsonLdOptions {
    /// Parse options from JSON; missing keys take their defaults
    pub fn from_json_str(content: &str) -> Result<Self, SchemaError> {
        let options: JsonLdOptions = serde_json::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|e| SchemaError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if let Some(base) = &self.base_url {
            let url = Url::parse(base)
                .map_err(|e| SchemaError::InvalidConfig(format!("base_url '{}': {}", base, e)))?;
            if url.cannot_be_a_base() {
                return Err(SchemaError::InvalidConfig(format!(
                    "base_url '{}' cannot be used as a base",
                    base
                )));
            }
        }
        if self.utc_offset_seconds.abs() >= 86_400 {
            return Err(SchemaError::InvalidConfig(format!(
                "utc_offset_seconds {} is out of range",
                self.utc_offset_seconds
            )));
        }
        if self.max_depth == 0 {
            return Err(SchemaError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if let Some(source) = self.identifiers.iter().find(|s| s.property_id.is_empty()) {
            return Err(SchemaError::InvalidConfig(format!(
                "identifier source {:?} has an empty property_id",
                source.field
            )));
        }
        Ok(())
    }

    /// Parsed base URL; `None` when unset or invalid
    pub fn base(&self) -> Option<Url> {
        self.base_url.as_deref().and_then(|b| Url::parse(b).ok())
    }
}
