//! Extension points
//!
//! Callers register implementations of these traits on the serializer and
//! the assembler; they run in registration order.

use serde_json::{Map, Value};

use crate::record::{ContentRecord, RecordRef};

/// A breadcrumb trail entry of the current route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    pub url: String,
}

impl Crumb {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// The request a document is built for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteContext {
    pub path: String,
    /// Record the route displays, if any
    pub primary: Option<RecordRef>,
    pub breadcrumbs: Vec<Crumb>,
}

impl RouteContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Route of a record's canonical page
    pub fn for_record(reference: RecordRef) -> Self {
        Self {
            path: format!("/{}", reference),
            primary: Some(reference),
            breadcrumbs: Vec::new(),
        }
    }

    pub fn with_breadcrumbs(mut self, breadcrumbs: Vec<Crumb>) -> Self {
        self.breadcrumbs = breadcrumbs;
        self
    }
}

/// Supplies route-level data that does not come from a record
pub trait ContextualDataProvider: Send + Sync {
    /// Namespace of the provider's output in the assembled structure
    fn name(&self) -> &str;

    fn provide(&self, route: &RouteContext) -> Option<Value>;
}

/// Per-record hooks run after a record's fields are serialized
pub trait RecordExtension: Send + Sync {
    /// Inject data the field mapping cannot produce
    fn load(&self, _data: &mut Map<String, Value>, _record: &ContentRecord) {}

    /// Final corrections; runs after every extension's `load`
    fn alter(&self, _data: &mut Map<String, Value>, _record: &ContentRecord) {}
}

/// Adjusts one resolved field value before cardinality collapsing
pub trait PropertyValueAlter: Send + Sync {
    fn alter(&self, value: &mut Value, item: &Value, property: &str);
}

/// Adjusts the assembled structure before documents are extracted
pub trait DocumentAlter: Send + Sync {
    fn alter(&self, data: &mut Map<String, Value>, route: &RouteContext);
}

/// Key under which a provider's output is stored
pub fn provider_key(name: &str) -> String {
    format!("{}_jsonld", name)
}
