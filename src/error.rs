//! Error types for Schema.org mapping and JSON-LD output

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load {path}: {reason}")]
    LoadError { path: String, reason: String },

    #[error("Invalid vocabulary data: {0}")]
    InvalidVocabulary(String),

    #[error("Cycle detected: type '{0}' is its own ancestor")]
    CyclicHierarchy(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid route '{0}': expected <entity_type>/<id>")]
    InvalidRoute(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
}
