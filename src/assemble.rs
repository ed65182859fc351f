//! Document assembly
//!
//! Builds the JSON-LD output for one route: contextual providers, the
//! serialized primary record, document alters, then every `@type` object
//! found in the result becomes its own `@context`-qualified document.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::SchemaError;
use crate::extension::{provider_key, ContextualDataProvider, DocumentAlter, RouteContext};
use crate::serialize::EntitySerializer;
use crate::vocab::{CONTEXT_KEY, PRIMARY_ENTITY_KEY, SCHEMA_CONTEXT, TYPE_KEY};

pub struct DocumentAssembler {
    serializer: EntitySerializer,
    providers: Vec<Box<dyn ContextualDataProvider>>,
    alters: Vec<Box<dyn DocumentAlter>>,
}

impl DocumentAssembler {
    pub fn new(serializer: EntitySerializer) -> Self {
        Self {
            serializer,
            providers: Vec::new(),
            alters: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: impl ContextualDataProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn with_alter(mut self, alter: impl DocumentAlter + 'static) -> Self {
        self.alters.push(Box::new(alter));
        self
    }

    pub fn serializer(&self) -> &EntitySerializer {
        &self.serializer
    }

    /// Collect provider output and the primary record, then run document alters
    pub fn assemble(&self, route: &RouteContext) -> Map<String, Value> {
        let mut data = Map::new();

        for provider in &self.providers {
            match provider.provide(route) {
                Some(value) if !is_empty_value(&value) => {
                    data.insert(provider_key(provider.name()), value);
                }
                _ => debug!("Provider '{}' had nothing for {}", provider.name(), route.path),
            }
        }

        if let Some(entity) = self.primary_entity(route) {
            data.insert(PRIMARY_ENTITY_KEY.to_string(), Value::Object(entity));
        }

        for alter in &self.alters {
            alter.alter(&mut data, route);
        }

        data
    }

    /// JSON-LD for a route: one document, a list of documents, or `None`
    pub fn build(&self, route: &RouteContext) -> Option<Value> {
        let data = self.assemble(route);
        if data.is_empty() {
            debug!("No structured data for {}", route.path);
            return None;
        }

        let mut documents = Vec::new();
        collect_documents(Value::Object(data), &mut documents);

        match documents.len() {
            0 => None,
            1 => documents.pop().map(Value::Object),
            _ => Some(Value::Array(
                documents.into_iter().map(Value::Object).collect(),
            )),
        }
    }

    fn primary_entity(&self, route: &RouteContext) -> Option<Map<String, Value>> {
        let reference = route.primary.as_ref()?;
        let Some(record) = self.serializer.records().load(reference) else {
            debug!("Primary record {} of {} not found", reference, route.path);
            return None;
        };
        if !self.serializer.access().can_view(record) {
            return None;
        }
        self.serializer.serialize(record)
    }
}

/// Gather every object carrying a `@type`, outermost first, each with its own `@context`
fn collect_documents(value: Value, documents: &mut Vec<Map<String, Value>>) {
    match value {
        Value::Object(obj) if obj.contains_key(TYPE_KEY) => {
            let mut document = Map::new();
            document.insert(CONTEXT_KEY.to_string(), json!(SCHEMA_CONTEXT));
            for (key, value) in obj {
                if key != CONTEXT_KEY {
                    document.insert(key, value);
                }
            }
            documents.push(document);
        }
        Value::Object(obj) => {
            for (_, value) in obj {
                collect_documents(value, documents);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_documents(item, documents);
            }
        }
        _ => {}
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

/// Serialize a document to a JSON string
pub fn to_json_string(document: &Value, pretty: bool) -> Result<String, SchemaError> {
    if pretty {
        Ok(serde_json::to_string_pretty(document)?)
    } else {
        Ok(serde_json::to_string(document)?)
    }
}

/// Emits the route's breadcrumb trail as a `BreadcrumbList`
#[derive(Debug, Clone, Copy, Default)]
pub struct BreadcrumbListProvider;

impl ContextualDataProvider for BreadcrumbListProvider {
    fn name(&self) -> &str {
        "breadcrumb"
    }

    fn provide(&self, route: &RouteContext) -> Option<Value> {
        if route.breadcrumbs.len() < 2 {
            return None;
        }

        let items: Vec<Value> = route
            .breadcrumbs
            .iter()
            .enumerate()
            .map(|(i, crumb)| {
                json!({
                    "@type": "ListItem",
                    "position": i + 1,
                    "item": {
                        "@id": crumb.url,
                        "name": crumb.label,
                    },
                })
            })
            .collect();

        Some(json!({
            "@type": "BreadcrumbList",
            "itemListElement": items,
        }))
    }
}
