//! Schema.org JSON-LD Library
//!
//! This library maps typed content records onto the Schema.org vocabulary
//! and emits structured linked data (JSON-LD) describing them.
//!
//! # Overview
//!
//! - [`VocabularyStore`] holds the Schema.org types and properties and
//!   answers graph queries: subtype closure, multi-parent breadcrumbs,
//!   type trees and "is-a"/"has-property" predicates.
//! - [`EntitySerializer`] walks a record's mapped fields, resolving each
//!   value through the [`PropertyValueResolver`] strategy table and
//!   recursing into referenced records with cycle guards.
//! - [`DocumentAssembler`] combines contextual data and the primary record
//!   into one or more `@context`-qualified documents.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use schemaorg_jsonld::{DocumentAssembler, RecordRef, RouteContext, Site, JsonLdOptions};
//!
//! let site = Site::from_file(Path::new("site.json"))?;
//! let assembler = DocumentAssembler::new(site.serializer(JsonLdOptions::default()));
//!
//! if let Some(doc) = assembler.build(&RouteContext::for_record(RecordRef::new("node", "1"))) {
//!     println!("{}", to_json_string(&doc, true)?);
//! }
//! ```

pub mod assemble;
pub mod config;
pub mod error;
pub mod extension;
pub mod graph;
pub mod mapping;
pub mod order;
pub mod record;
pub mod resolve;
pub mod serialize;
pub mod site;
pub mod store;
pub mod vocab;

// Re-export main types for convenience
pub use crate::assemble::{to_json_string, BreadcrumbListProvider, DocumentAssembler};
pub use crate::config::{IdentifierSource, JsonLdOptions};
pub use crate::error::SchemaError;
pub use crate::extension::{
    ContextualDataProvider, Crumb, DocumentAlter, PropertyValueAlter, RecordExtension,
    RouteContext,
};
pub use crate::graph::{parse_ids, TypeTree, TypeTreeNode};
pub use crate::mapping::{InMemoryMappingRegistry, Mapping, MappingRegistry, PropertyBinding};
pub use crate::record::{
    AccessPolicy, AllowAll, Cardinality, ContentRecord, Field, InMemoryRecordStore, RecordRef,
    RecordStore,
};
pub use crate::resolve::{
    FileUrlGenerator, MarkupRenderer, PropertyValueResolver, ResolveContext, ValueStrategy,
};
pub use crate::serialize::EntitySerializer;
pub use crate::site::{Site, SiteData};
pub use crate::store::{PropertyNode, TypeNode, VocabularyStore};
pub use crate::vocab::SCHEMA_CONTEXT;
