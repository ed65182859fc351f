//! Record to JSON-LD serialization
//!
//! Walks a record's mapped fields in mapping order, resolves each stored
//! value, collapses cardinality, tags ordered items with positions, injects
//! identifiers and emits one ordered object. Referenced records recurse back
//! into the serializer, guarded by:
//!
//! - the lookahead flag: records with their own public URL only link to
//!   what they reference,
//! - the walk path: a record already being serialized higher up is linked,
//! - the depth cap from [`JsonLdOptions::max_depth`].

use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::JsonLdOptions;
use crate::extension::{PropertyValueAlter, RecordExtension};
use crate::mapping::{Mapping, MappingRegistry};
use crate::order::sort_properties;
use crate::record::{main_value, AccessPolicy, AllowAll, ContentRecord, Field, RecordRef, RecordStore};
use crate::resolve::{absolute_url, PropertyValueResolver, ResolveContext};
use crate::store::VocabularyStore;
use crate::vocab::{
    IDENTIFIER_PROPERTY, POSITION_PROPERTY, PROPERTY_VALUE_TYPE, SUBTYPE_FIELD, TYPE_KEY, URL_KEY,
};

/// Records currently being serialized, outermost first
#[derive(Debug, Clone)]
pub struct Walk {
    path: Vec<RecordRef>,
    max_depth: usize,
}

impl Walk {
    pub fn new(max_depth: usize) -> Self {
        Self {
            path: Vec::new(),
            max_depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn contains(&self, reference: &RecordRef) -> bool {
        self.path.contains(reference)
    }

    pub fn at_limit(&self) -> bool {
        self.path.len() >= self.max_depth
    }

    fn enter(&mut self, reference: RecordRef) {
        self.path.push(reference);
    }

    fn leave(&mut self) {
        self.path.pop();
    }
}

/// Serializes mapped records into Schema.org objects
pub struct EntitySerializer {
    vocabulary: Arc<VocabularyStore>,
    mappings: Arc<dyn MappingRegistry>,
    records: Arc<dyn RecordStore>,
    access: Arc<dyn AccessPolicy>,
    resolver: PropertyValueResolver,
    options: JsonLdOptions,
    record_extensions: Vec<Box<dyn RecordExtension>>,
    value_alters: Vec<Box<dyn PropertyValueAlter>>,
}

impl EntitySerializer {
    pub fn new(
        vocabulary: Arc<VocabularyStore>,
        mappings: Arc<dyn MappingRegistry>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            vocabulary,
            mappings,
            records,
            access: Arc::new(AllowAll),
            resolver: PropertyValueResolver::new(),
            options: JsonLdOptions::default(),
            record_extensions: Vec::new(),
            value_alters: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: JsonLdOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_access(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    pub fn with_resolver(mut self, resolver: PropertyValueResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_record_extension(mut self, extension: impl RecordExtension + 'static) -> Self {
        self.record_extensions.push(Box::new(extension));
        self
    }

    pub fn with_value_alter(mut self, alter: impl PropertyValueAlter + 'static) -> Self {
        self.value_alters.push(Box::new(alter));
        self
    }

    pub fn vocabulary(&self) -> &VocabularyStore {
        &self.vocabulary
    }

    pub fn options(&self) -> &JsonLdOptions {
        &self.options
    }

    pub fn resolver(&self) -> &PropertyValueResolver {
        &self.resolver
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn access(&self) -> &dyn AccessPolicy {
        self.access.as_ref()
    }

    pub fn mappings(&self) -> &dyn MappingRegistry {
        self.mappings.as_ref()
    }

    /// Serialize a record; `None` when it has no mapping
    pub fn serialize(&self, record: &ContentRecord) -> Option<Map<String, Value>> {
        let mut walk = Walk::new(self.options.max_depth);
        self.serialize_record(record, &mut walk, false)
    }

    fn serialize_record(
        &self,
        record: &ContentRecord,
        walk: &mut Walk,
        link_references: bool,
    ) -> Option<Map<String, Value>> {
        let Some(mapping) = self.mappings.mapping_for(&record.entity_type, &record.bundle) else {
            debug!("{} ({}) is not mapped", record.reference(), record.bundle);
            return None;
        };

        walk.enter(record.reference());
        let properties = self.resolve_properties(record, mapping, walk, link_references);
        walk.leave();

        let mut data = Map::new();
        data.insert(
            TYPE_KEY.to_string(),
            Value::String(self.schema_type_for(record, mapping)),
        );
        if let Some(url) = self.public_url(record) {
            data.insert(URL_KEY.to_string(), Value::String(url));
        }
        data.extend(properties);
        self.inject_identifiers(&mut data, record);

        for extension in &self.record_extensions {
            extension.load(&mut data, record);
        }
        for extension in &self.record_extensions {
            extension.alter(&mut data, record);
        }

        if !data.contains_key(TYPE_KEY) {
            return None;
        }
        Some(sort_properties(data, &self.options.property_order))
    }

    fn resolve_properties(
        &self,
        record: &ContentRecord,
        mapping: &Mapping,
        walk: &mut Walk,
        link_references: bool,
    ) -> Map<String, Value> {
        let mut properties = Map::new();

        for (field_name, property) in self.mappings.field_bindings(mapping) {
            let Some(field) = record.field(field_name) else {
                continue;
            };
            if !self.access.can_view_field(record, field_name) {
                trace!("Skipping field '{}' of {}: access denied", field_name, record.reference());
                continue;
            }

            let values = self.resolve_field(record, field, property, walk, link_references);
            let value = if field.cardinality.is_single() {
                values.into_iter().next()
            } else if values.is_empty() {
                None
            } else {
                Some(Value::Array(values))
            };

            if let Some(value) = value {
                merge_property(&mut properties, property, value);
            }
        }

        properties
    }

    /// Resolve every stored item of a field, in stored order, dropping omissions
    fn resolve_field(
        &self,
        record: &ContentRecord,
        field: &Field,
        property: &str,
        walk: &mut Walk,
        link_references: bool,
    ) -> Vec<Value> {
        let strategy = self.resolver.strategy_for(&field.shape);
        let tag_positions = field.items.len() > 1;
        let mut position: u64 = 1;
        let mut values = Vec::new();

        for item in &field.items {
            let mut cx = ResolveContext {
                serializer: self,
                walk: &mut *walk,
                link_references,
                record,
                field,
                property,
            };
            let Some(mut value) = strategy.resolve(&mut cx, item) else {
                continue;
            };

            if tag_positions && self.accepts_position(&value) {
                if let Value::Object(obj) = &mut value {
                    obj.insert(POSITION_PROPERTY.to_string(), json!(position));
                    *obj = sort_properties(std::mem::take(obj), &self.options.property_order);
                }
                position += 1;
            }

            for alter in &self.value_alters {
                alter.alter(&mut value, item, property);
            }
            if !value.is_null() {
                values.push(value);
            }
        }

        values
    }

    fn accepts_position(&self, value: &Value) -> bool {
        value
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .map(|schema_type| self.vocabulary.has_property(schema_type, POSITION_PROPERTY))
            .unwrap_or(false)
    }

    /// The mapped type, narrowed by the record's subtype when that is a valid subtype
    fn schema_type_for(&self, record: &ContentRecord, mapping: &Mapping) -> String {
        if mapping.subtype {
            if let Some(subtype) = record
                .first_value(SUBTYPE_FIELD)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
            {
                if self
                    .vocabulary
                    .is_subtype_of(subtype, &[mapping.schema_type.as_str()])
                {
                    return subtype.to_string();
                }
                debug!(
                    "Ignoring subtype '{}' of {}: not a subtype of {}",
                    subtype,
                    record.reference(),
                    mapping.schema_type
                );
            }
        }
        mapping.schema_type.clone()
    }

    /// Absolute canonical URL, if the record has one and the viewer may see it
    pub fn public_url(&self, record: &ContentRecord) -> Option<String> {
        let url = record.url.as_deref().filter(|u| !u.trim().is_empty())?;
        if !self.access.can_view(record) {
            return None;
        }
        absolute_url(url, self.options.base().as_ref())
    }

    fn inject_identifiers(&self, data: &mut Map<String, Value>, record: &ContentRecord) {
        let injected: Vec<Value> = self
            .options
            .identifiers
            .iter()
            .filter_map(|source| {
                let value = match &source.field {
                    Some(field) => record.first_value(field).and_then(identifier_value),
                    None => record.uuid.clone().filter(|u| !u.is_empty()),
                }?;
                Some(json!({
                    "@type": PROPERTY_VALUE_TYPE,
                    "propertyID": source.property_id,
                    "value": value,
                }))
            })
            .collect();

        if injected.is_empty() {
            return;
        }

        let mut identifiers = match data.remove(IDENTIFIER_PROPERTY) {
            Some(Value::Array(existing)) => existing,
            Some(existing) => vec![existing],
            None => Vec::new(),
        };
        identifiers.extend(injected);
        data.insert(IDENTIFIER_PROPERTY.to_string(), Value::Array(identifiers));
    }

    /// Resolve a reference found while serializing another record
    pub(crate) fn resolve_reference(
        &self,
        target: &RecordRef,
        walk: &mut Walk,
        link_references: bool,
    ) -> Option<Value> {
        let Some(record) = self.records.load(target) else {
            debug!("Unresolvable reference to {}", target);
            return None;
        };
        if !self.access.can_view(record) {
            debug!("Reference to {} is not viewable", target);
            return None;
        }
        let Some(mapping) = self.mappings.mapping_for(&record.entity_type, &record.bundle) else {
            return label_value(record);
        };

        if walk.at_limit() {
            warn!(
                "Depth limit {} reached at {} (walk depth {}), linking instead of expanding",
                self.options.max_depth,
                target,
                walk.depth()
            );
            return self.link_value(record, mapping);
        }
        if link_references || walk.contains(target) {
            return self.link_value(record, mapping);
        }

        let nested_link = self.public_url(record).is_some();
        self.serialize_record(record, walk, nested_link)
            .map(Value::Object)
    }

    /// Minimal reference: type, URL and name, or the label alone without a URL
    fn link_value(&self, record: &ContentRecord, mapping: &Mapping) -> Option<Value> {
        let Some(url) = self.public_url(record) else {
            return label_value(record);
        };

        let mut link = Map::new();
        link.insert(
            TYPE_KEY.to_string(),
            Value::String(self.schema_type_for(record, mapping)),
        );
        link.insert(URL_KEY.to_string(), Value::String(url));
        if !record.label.trim().is_empty() {
            link.insert("name".to_string(), Value::String(record.label.trim().to_string()));
        }
        Some(Value::Object(link))
    }
}

fn label_value(record: &ContentRecord) -> Option<Value> {
    let label = record.label.trim();
    if label.is_empty() {
        None
    } else {
        Some(Value::String(label.to_string()))
    }
}

fn identifier_value(value: &Value) -> Option<String> {
    match main_value(value) {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Add a property value, turning the property into a list if it is already set
fn merge_property(properties: &mut Map<String, Value>, property: &str, value: Value) {
    let merged = match properties.remove(property) {
        None => value,
        Some(existing) => {
            let mut list = match existing {
                Value::Array(items) => items,
                other => vec![other],
            };
            match value {
                Value::Array(items) => list.extend(items),
                other => list.push(other),
            }
            Value::Array(list)
        }
    };
    properties.insert(property.to_string(), merged);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::InMemoryMappingRegistry;
    use crate::record::InMemoryRecordStore;
    use crate::resolve::MarkupRenderer;
    use crate::store::{PropertyNode, TypeNode};
    use serde_json::json;

    fn vocabulary() -> Arc<VocabularyStore> {
        Arc::new(
            VocabularyStore::new(
                vec![
                    TypeNode::new("Thing").with_properties(&["name", "identifier"]),
                    TypeNode::new("Person").with_parents(&["Thing"]),
                    TypeNode::new("Patient").with_parents(&["Person"]),
                    TypeNode::new("Organization").with_parents(&["Thing"]),
                    TypeNode::new("CreativeWork")
                        .with_parents(&["Thing"])
                        .with_properties(&["position"]),
                    TypeNode::new("HowToStep").with_parents(&["CreativeWork"]),
                ],
                vec![PropertyNode::new("step").with_range(&["HowToStep"])],
            )
            .unwrap(),
        )
    }

    fn serializer(mappings: Vec<Mapping>, records: Vec<ContentRecord>) -> EntitySerializer {
        let mappings: InMemoryMappingRegistry = mappings.into_iter().collect();
        let records: InMemoryRecordStore = records.into_iter().collect();
        EntitySerializer::new(vocabulary(), Arc::new(mappings), Arc::new(records))
    }

    fn keys(value: &Map<String, Value>) -> Vec<&str> {
        value.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_unmapped_record() {
        let serializer = serializer(vec![], vec![]);
        let record = ContentRecord::new("node", "page", "1").with_label("About");
        assert!(serializer.serialize(&record).is_none());
    }

    #[test]
    fn test_cardinality_collapse() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("title", "name")
                .bind("alt_names", "alternateName")],
            vec![],
        );
        let record = ContentRecord::new("node", "person", "1")
            .with_field(Field::new("title", "string").with_items(vec![json!("Jane")]))
            .with_field(
                Field::new("alt_names", "string")
                    .unbounded()
                    .with_items(vec![json!("J")]),
            );

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(data["name"], json!("Jane"));
        assert_eq!(data["alternateName"], json!(["J"]));
    }

    #[test]
    fn test_empty_values_skip_property() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("title", "name")
                .bind("missing", "description")
                .bind("alt_names", "alternateName")],
            vec![],
        );
        let record = ContentRecord::new("node", "person", "1")
            .with_field(Field::new("title", "string").with_items(vec![json!("  ")]))
            .with_field(Field::new("alt_names", "string").unbounded());

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(keys(&data), vec!["@type"]);
    }

    #[test]
    fn test_url_and_identifier_lead() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("title", "name")
                .bind("code", "identifier")],
            vec![],
        )
        .with_options(JsonLdOptions {
            base_url: Some("https://example.org/".to_string()),
            ..Default::default()
        });
        let record = ContentRecord::new("node", "person", "1")
            .with_url("/people/jane")
            .with_uuid("3f1c")
            .with_field(Field::new("title", "string").with_items(vec![json!("Jane")]))
            .with_field(Field::new("code", "string").with_items(vec![json!("J-1")]));

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(keys(&data), vec!["@type", "@url", "identifier", "name"]);
        assert_eq!(data["@url"], json!("https://example.org/people/jane"));
        assert_eq!(
            data["identifier"],
            json!([
                "J-1",
                {"@type": "PropertyValue", "propertyID": "uuid", "value": "3f1c"}
            ])
        );
    }

    #[test]
    fn test_subtype_selection() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person").with_subtype()],
            vec![],
        );
        let patient = ContentRecord::new("node", "person", "1")
            .with_field(Field::new(SUBTYPE_FIELD, "list_string").with_items(vec![json!("Patient")]));
        assert_eq!(serializer.serialize(&patient).unwrap()["@type"], json!("Patient"));

        let bogus = ContentRecord::new("node", "person", "2")
            .with_field(Field::new(SUBTYPE_FIELD, "list_string").with_items(vec![json!("Organization")]));
        assert_eq!(serializer.serialize(&bogus).unwrap()["@type"], json!("Person"));
    }

    #[test]
    fn test_position_tagging() {
        let serializer = serializer(
            vec![
                Mapping::new("node", "recipe", "CreativeWork").bind("steps", "step"),
                Mapping::new("node", "step", "HowToStep").bind("title", "name"),
            ],
            (1..=3)
                .map(|i| {
                    ContentRecord::new("node", "step", i.to_string())
                        .with_field(Field::new("title", "string").with_items(vec![json!(format!("Step {}", i))]))
                })
                .collect(),
        );
        let record = ContentRecord::new("node", "recipe", "10").with_field(
            Field::new("steps", "entity_reference")
                .unbounded()
                .with_target_type("node")
                .with_items(vec![json!({"target_id": "1"}), json!({"target_id": "2"}), json!({"target_id": "3"})]),
        );

        let data = serializer.serialize(&record).unwrap();
        let steps = data["step"].as_array().unwrap();
        assert_eq!(steps.len(), 3);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step["position"], json!(i + 1));
            assert_eq!(step["name"], json!(format!("Step {}", i + 1)));
        }
        let first = steps[0].as_object().unwrap();
        assert_eq!(keys(first), vec!["@type", "name", "position"]);
    }

    #[test]
    fn test_no_position_for_single_value() {
        let serializer = serializer(
            vec![
                Mapping::new("node", "recipe", "CreativeWork").bind("steps", "step"),
                Mapping::new("node", "step", "HowToStep").bind("title", "name"),
            ],
            vec![ContentRecord::new("node", "step", "1")
                .with_field(Field::new("title", "string").with_items(vec![json!("Only")]))],
        );
        let record = ContentRecord::new("node", "recipe", "10").with_field(
            Field::new("steps", "entity_reference")
                .unbounded()
                .with_target_type("node")
                .with_items(vec![json!({"target_id": "1"})]),
        );
        let data = serializer.serialize(&record).unwrap();
        assert!(data["step"][0].get("position").is_none());
    }

    #[test]
    fn test_reference_cycle_links() {
        // a -> b -> a, neither has a URL
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("title", "name")
                .bind("knows", "knows")],
            vec![
                ContentRecord::new("node", "person", "a")
                    .with_label("A")
                    .with_field(Field::new("title", "string").with_items(vec![json!("A")]))
                    .with_field(Field::new("knows", "entity_reference").with_target_type("node").with_items(vec![json!("b")])),
                ContentRecord::new("node", "person", "b")
                    .with_label("B")
                    .with_field(Field::new("title", "string").with_items(vec![json!("B")]))
                    .with_field(Field::new("knows", "entity_reference").with_target_type("node").with_items(vec![json!("a")])),
            ],
        );
        let a = serializer
            .records()
            .load(&RecordRef::new("node", "a"))
            .unwrap()
            .clone();

        let data = serializer.serialize(&a).unwrap();
        assert_eq!(data["knows"]["name"], json!("B"));
        // back-reference to the record being serialized becomes its label
        assert_eq!(data["knows"]["knows"], json!("A"));
    }

    #[test]
    fn test_lookahead_links_one_level_down() {
        let serializer = serializer(
            vec![
                Mapping::new("node", "event", "CreativeWork").bind("author", "author"),
                Mapping::new("node", "person", "Person")
                    .bind("title", "name")
                    .bind("org", "worksFor"),
                Mapping::new("node", "org", "Organization").bind("title", "name"),
            ],
            vec![
                ContentRecord::new("node", "person", "p")
                    .with_label("Pat")
                    .with_url("https://example.org/p")
                    .with_field(Field::new("title", "string").with_items(vec![json!("Pat")]))
                    .with_field(Field::new("org", "entity_reference").with_target_type("node").with_items(vec![json!("o")])),
                ContentRecord::new("node", "org", "o")
                    .with_label("Org")
                    .with_url("https://example.org/o")
                    .with_field(Field::new("title", "string").with_items(vec![json!("Org")])),
            ],
        );
        let event = ContentRecord::new("node", "event", "e").with_field(
            Field::new("author", "entity_reference")
                .with_target_type("node")
                .with_items(vec![json!("p")]),
        );

        let data = serializer.serialize(&event).unwrap();
        assert_eq!(data["author"]["name"], json!("Pat"));
        assert_eq!(
            data["author"]["worksFor"],
            json!({"@type": "Organization", "@url": "https://example.org/o", "name": "Org"})
        );
    }

    #[test]
    fn test_unmapped_and_missing_references() {
        let serializer = serializer(
            vec![Mapping::new("node", "article", "CreativeWork").bind("tags", "keywords")],
            vec![ContentRecord::new("taxonomy_term", "tags", "1").with_label("Rust")],
        );
        let record = ContentRecord::new("node", "article", "1").with_field(
            Field::new("tags", "entity_reference")
                .unbounded()
                .with_target_type("taxonomy_term")
                .with_items(vec![json!({"target_id": "1"}), json!({"target_id": "404"})]),
        );
        let data = serializer.serialize(&record).unwrap();
        assert_eq!(data["keywords"], json!(["Rust"]));
    }

    #[test]
    fn test_several_fields_one_property() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("nick", "alternateName")
                .bind("aliases", "alternateName")],
            vec![],
        );
        let record = ContentRecord::new("node", "person", "1")
            .with_field(Field::new("nick", "string").with_items(vec![json!("JJ")]))
            .with_field(Field::new("aliases", "string").unbounded().with_items(vec![json!("J"), json!("Jay")]));
        let data = serializer.serialize(&record).unwrap();
        assert_eq!(data["alternateName"], json!(["JJ", "J", "Jay"]));
    }

    struct Shout;

    impl PropertyValueAlter for Shout {
        fn alter(&self, value: &mut Value, _item: &Value, property: &str) {
            if property == "name" {
                if let Some(s) = value.as_str() {
                    *value = Value::String(s.to_uppercase());
                }
            }
        }
    }

    struct AddGenre;

    impl RecordExtension for AddGenre {
        fn load(&self, data: &mut Map<String, Value>, record: &ContentRecord) {
            data.insert("genre".to_string(), json!(record.bundle));
        }

        fn alter(&self, data: &mut Map<String, Value>, _record: &ContentRecord) {
            data.remove("alternateName");
        }
    }

    #[test]
    fn test_extensions() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("title", "name")
                .bind("nick", "alternateName")],
            vec![],
        )
        .with_value_alter(Shout)
        .with_record_extension(AddGenre);
        let record = ContentRecord::new("node", "person", "1")
            .with_field(Field::new("title", "string").with_items(vec![json!("Jane")]))
            .with_field(Field::new("nick", "string").with_items(vec![json!("JJ")]));

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(Value::Object(data), json!({"@type": "Person", "genre": "person", "name": "JANE"}));
    }

    struct HideNick;

    impl AccessPolicy for HideNick {
        fn can_view(&self, record: &ContentRecord) -> bool {
            record.id != "secret"
        }

        fn can_view_field(&self, _record: &ContentRecord, field: &str) -> bool {
            field != "nick"
        }
    }

    #[test]
    fn test_access_policy() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("nick", "alternateName")
                .bind("friend", "knows")],
            vec![ContentRecord::new("node", "person", "secret").with_label("Hidden")],
        )
        .with_access(Arc::new(HideNick));
        let record = ContentRecord::new("node", "person", "1")
            .with_url("https://example.org/1")
            .with_field(Field::new("nick", "string").with_items(vec![json!("JJ")]))
            .with_field(Field::new("friend", "entity_reference").with_target_type("node").with_items(vec![json!("secret")]));

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(keys(&data), vec!["@type", "@url"]);
    }

    #[test]
    fn test_idempotent() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("title", "name")
                .bind("alt", "alternateName")],
            vec![],
        );
        let record = ContentRecord::new("node", "person", "1")
            .with_uuid("u-1")
            .with_field(Field::new("title", "string").with_items(vec![json!("Jane")]))
            .with_field(Field::new("alt", "string").unbounded().with_items(vec![json!("J")]));

        let first = serde_json::to_string(&serializer.serialize(&record)).unwrap();
        let second = serde_json::to_string(&serializer.serialize(&record)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_property() {
        let mut properties = Map::new();
        merge_property(&mut properties, "name", json!("a"));
        merge_property(&mut properties, "name", json!(["b", "c"]));
        assert_eq!(properties["name"], json!(["a", "b", "c"]));
    }

    fn with_base(serializer: EntitySerializer, options: JsonLdOptions) -> EntitySerializer {
        serializer.with_options(JsonLdOptions {
            base_url: Some("https://ex.org/".to_string()),
            ..options
        })
    }

    #[test]
    fn test_image_style_derivative() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("photo", "image")
                .bind("logo_file", "logo")],
            vec![],
        );
        let serializer = with_base(
            serializer,
            JsonLdOptions {
                image_styles: [("image".to_string(), "large".to_string())].into_iter().collect(),
                ..Default::default()
            },
        );
        let record = ContentRecord::new("node", "person", "1")
            .with_field(Field::new("photo", "image").with_items(vec![json!({"uri": "files/a.jpg"})]))
            .with_field(Field::new("logo_file", "file").with_items(vec![json!("files/b.png")]));

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(data["image"], json!("https://ex.org/styles/large/files/a.jpg"));
        assert_eq!(data["logo"], json!("https://ex.org/files/b.png"));
    }

    struct TagFormat;

    impl MarkupRenderer for TagFormat {
        fn render(&self, text: &str, format: Option<&str>) -> String {
            format!("[{}] {}", format.unwrap_or("plain"), text)
        }
    }

    #[test]
    fn test_rich_text_uses_markup_renderer() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person").bind("body", "description")],
            vec![],
        )
        .with_resolver(PropertyValueResolver::new().with_markup(TagFormat));
        let record = ContentRecord::new("node", "person", "1").with_field(
            Field::new("body", "text_long")
                .with_items(vec![json!({"value": "<p>Hi</p>", "format": "basic_html"})]),
        );

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(data["description"], json!("[basic_html] <p>Hi</p>"));
    }

    #[test]
    fn test_link_values() {
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("website", "url")
                .bind("related", "sameAs")],
            vec![ContentRecord::new("node", "person", "2")
                .with_label("Other")
                .with_url("/node/2")],
        );
        let serializer = with_base(serializer, JsonLdOptions::default());
        let record = ContentRecord::new("node", "person", "1")
            .with_field(Field::new("website", "link").with_items(vec![json!({"uri": "internal:/about"})]))
            .with_field(Field::new("related", "link").unbounded().with_items(vec![
                json!({"uri": "entity:node/2"}),
                json!({"uri": "entity:node/404"}),
                json!("https://other.org/jane"),
            ]));

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(data["url"], json!("https://ex.org/about"));
        assert_eq!(
            data["sameAs"],
            json!(["https://ex.org/node/2", "https://other.org/jane"])
        );
    }

    #[test]
    fn test_composite_typed_from_range() {
        let serializer = serializer(
            vec![Mapping::new("node", "recipe", "CreativeWork")
                .bind("instructions", "step")
                .bind("notes", "about")
                .bind("credit", "author")],
            vec![],
        );
        let record = ContentRecord::new("node", "recipe", "1")
            .with_field(
                Field::new("instructions", "composite")
                    .with_items(vec![json!({"text": "  ", "name": "Mix", "image": null})]),
            )
            .with_field(Field::new("notes", "composite").with_items(vec![json!({"name": "untyped"})]))
            .with_field(
                Field::new("credit", "composite")
                    .with_items(vec![json!({"name": "Jane", "@type": "Person"})]),
            );

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(
            serde_json::to_string(&data["step"]).unwrap(),
            r#"{"@type":"HowToStep","name":"Mix"}"#
        );
        // no structural range type for "about"
        assert!(data.get("about").is_none());
        assert_eq!(data["author"], json!({"@type": "Person", "name": "Jane"}));
    }

    #[test]
    fn test_datetime_with_offset() {
        let serializer = serializer(
            vec![Mapping::new("node", "article", "CreativeWork")
                .bind("published", "datePublished")
                .bind("updated", "dateModified")],
            vec![],
        )
        .with_options(JsonLdOptions {
            utc_offset_seconds: 3600,
            ..Default::default()
        });
        let record = ContentRecord::new("node", "article", "1")
            .with_field(Field::new("published", "datetime").with_items(vec![json!("2024-03-01T23:30:00")]))
            .with_field(Field::new("updated", "datetime").with_items(vec![json!("soon")]));

        let data = serializer.serialize(&record).unwrap();
        assert_eq!(data["datePublished"], json!("2024-03-02 00:30:00 +0100"));
        assert!(data.get("dateModified").is_none());
    }

    #[test]
    fn test_depth_cap_links_instead_of_expanding() {
        let chain: Vec<ContentRecord> = (1..=5)
            .map(|i| {
                let record = ContentRecord::new("node", "person", format!("p{}", i))
                    .with_label(format!("P{}", i))
                    .with_field(Field::new("title", "string").with_items(vec![json!(format!("P{}", i))]));
                if i < 5 {
                    record.with_field(
                        Field::new("knows", "entity_reference")
                            .with_target_type("node")
                            .with_items(vec![json!(format!("p{}", i + 1))]),
                    )
                } else {
                    record
                }
            })
            .collect();
        let serializer = serializer(
            vec![Mapping::new("node", "person", "Person")
                .bind("title", "name")
                .bind("knows", "knows")],
            chain,
        )
        .with_options(JsonLdOptions {
            max_depth: 3,
            ..Default::default()
        });
        let first = serializer
            .records()
            .load(&RecordRef::new("node", "p1"))
            .unwrap()
            .clone();

        let data = serializer.serialize(&first).unwrap();
        assert_eq!(data["knows"]["name"], json!("P2"));
        assert_eq!(data["knows"]["knows"]["name"], json!("P3"));
        // p4 sits below the third level and is only linked
        assert_eq!(data["knows"]["knows"]["knows"], json!("P4"));
    }

    #[test]
    fn test_walk_tracks_depth() {
        let mut walk = Walk::new(2);
        walk.enter(RecordRef::new("node", "1"));
        assert_eq!(walk.depth(), 1);
        assert!(!walk.at_limit());
        walk.enter(RecordRef::new("node", "2"));
        assert!(walk.at_limit());
        assert!(walk.contains(&RecordRef::new("node", "1")));
        walk.leave();
        assert_eq!(walk.depth(), 1);
    }
}
