//! Field value resolution
//!
//! Converts one raw field item into a Schema.org-shaped value. Strategies are
//! registered per value-shape tag in [`PropertyValueResolver`]; a strategy
//! returning `None` means "omit this value".

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

use crate::config::JsonLdOptions;
use crate::order::{sort_properties, sort_with_fallback};
use crate::record::{main_value, reference_target, ContentRecord, Field, RecordRef};
use crate::serialize::{EntitySerializer, Walk};
use crate::store::VocabularyStore;
use crate::vocab::{POSTAL_ADDRESS_TYPE, TYPE_KEY};

/// Output format of date/time values
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Address components and the PostalAddress property each one feeds, in
/// emission order. Components sharing a property are joined with a space.
pub const ADDRESS_PROPERTIES: &[(&str, &str)] = &[
    ("organization", "name"),
    ("given_name", "name"),
    ("additional_name", "name"),
    ("family_name", "name"),
    ("locality", "addressLocality"),
    ("dependent_locality", "addressLocality"),
    ("administrative_area", "addressRegion"),
    ("country_code", "addressCountry"),
    ("postal_code", "postalCode"),
    ("sorting_code", "postOfficeBoxNumber"),
    ("address_line1", "streetAddress"),
    ("address_line2", "streetAddress"),
    ("address_line3", "streetAddress"),
];

/// Renders rich text (filtered markup) to the string that is emitted
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, text: &str, format: Option<&str>) -> String;
}

/// Emits stored markup unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMarkup;

impl MarkupRenderer for PassthroughMarkup {
    fn render(&self, text: &str, _format: Option<&str>) -> String {
        text.to_string()
    }
}

/// Turns stored file URIs into public URLs
pub trait FileUrlGenerator: Send + Sync {
    fn file_url(&self, uri: &str) -> Option<String>;

    /// URL of an image derivative generated with `style`
    fn derivative_url(&self, style: &str, uri: &str) -> Option<String>;
}

/// Resolves file paths against a base URL; derivatives live under `styles/<style>/`
#[derive(Debug, Clone, Default)]
pub struct BaseUrlFiles {
    base: Option<Url>,
}

impl BaseUrlFiles {
    pub fn new(base: Option<Url>) -> Self {
        Self { base }
    }
}

impl FileUrlGenerator for BaseUrlFiles {
    fn file_url(&self, uri: &str) -> Option<String> {
        absolute_url(uri, self.base.as_ref())
    }

    fn derivative_url(&self, style: &str, uri: &str) -> Option<String> {
        let uri = uri.trim();
        if uri.starts_with("//") || Url::parse(uri).is_ok() {
            // Remote file: no local derivative exists
            return self.file_url(uri);
        }
        let path = format!("styles/{}/{}", style, uri.trim_start_matches('/'));
        absolute_url(&path, self.base.as_ref())
    }
}

/// Make a URL absolute; relative URLs without a base are returned as-is
pub fn absolute_url(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    let raw = raw.strip_prefix("internal:").unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }

    match Url::parse(raw) {
        Ok(_) => Some(raw.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            // Protocol-relative: keep the host, take the base's scheme
            Some(base) if raw.starts_with("//") => base.join(raw).ok().map(|u| u.to_string()),
            Some(base) => base
                .join(raw.strip_prefix('/').unwrap_or(raw))
                .ok()
                .map(|u| u.to_string()),
            None => Some(raw.to_string()),
        },
        Err(e) => {
            debug!("Dropping unparseable URL '{}': {}", raw, e);
            None
        }
    }
}

/// Everything a strategy may consult while resolving one item
pub struct ResolveContext<'a> {
    pub(crate) serializer: &'a EntitySerializer,
    pub(crate) walk: &'a mut Walk,
    pub(crate) link_references: bool,
    /// Record owning the field
    pub record: &'a ContentRecord,
    pub field: &'a Field,
    /// Vocabulary property the field is bound to
    pub property: &'a str,
}

impl<'a> ResolveContext<'a> {
    pub fn vocabulary(&self) -> &VocabularyStore {
        self.serializer.vocabulary()
    }

    pub fn options(&self) -> &JsonLdOptions {
        self.serializer.options()
    }

    pub fn markup(&self) -> &dyn MarkupRenderer {
        self.serializer.resolver().markup()
    }

    pub fn file_url(&self, uri: &str) -> Option<String> {
        match self.serializer.resolver().files() {
            Some(files) => files.file_url(uri),
            None => BaseUrlFiles::new(self.options().base()).file_url(uri),
        }
    }

    pub fn derivative_url(&self, style: &str, uri: &str) -> Option<String> {
        match self.serializer.resolver().files() {
            Some(files) => files.derivative_url(style, uri),
            None => BaseUrlFiles::new(self.options().base()).derivative_url(style, uri),
        }
    }

    /// Serialize a referenced record, or link to it, following the walk's guards
    pub fn resolve_reference(&mut self, target: &RecordRef) -> Option<Value> {
        self.serializer
            .resolve_reference(target, self.walk, self.link_references)
    }

    /// Label of a referenced record the viewer may see
    pub fn reference_label(&self, target: &RecordRef) -> Option<Value> {
        let record = self.serializer.records().load(target)?;
        if !self.serializer.access().can_view(record) {
            return None;
        }
        non_empty_string(&record.label)
    }

    /// Public URL of a referenced record
    pub fn reference_url(&self, target: &RecordRef) -> Option<String> {
        let record = self.serializer.records().load(target)?;
        self.serializer.public_url(record)
    }
}

/// Resolution policy for one value shape
pub trait ValueStrategy: Send + Sync {
    fn resolve(&self, cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value>;
}

/// Strategy table keyed by value-shape tag
pub struct PropertyValueResolver {
    strategies: HashMap<String, Box<dyn ValueStrategy>>,
    fallback: Box<dyn ValueStrategy>,
    markup: Box<dyn MarkupRenderer>,
    files: Option<Box<dyn FileUrlGenerator>>,
}

impl Default for PropertyValueResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyValueResolver {
    /// Resolver with every built-in strategy registered
    pub fn new() -> Self {
        let mut resolver = Self::empty();

        for tag in ["string", "string_long", "text", "email", "telephone", "list_string"] {
            resolver.register(tag, ScalarStrategy(ScalarKind::Text));
        }
        for tag in ["integer", "list_integer"] {
            resolver.register(tag, ScalarStrategy(ScalarKind::Integer));
        }
        for tag in ["decimal", "float", "list_float"] {
            resolver.register(tag, ScalarStrategy(ScalarKind::Float));
        }
        resolver.register("boolean", ScalarStrategy(ScalarKind::Boolean));
        resolver.register("uri", LinkStrategy);
        resolver.register("link", LinkStrategy);
        resolver.register("text_long", RichTextStrategy);
        resolver.register("text_with_summary", RichTextStrategy);
        for tag in ["datetime", "daterange", "timestamp", "created", "changed"] {
            resolver.register(tag, DateTimeStrategy);
        }
        resolver.register("address", AddressStrategy);
        resolver.register("file", FileStrategy);
        resolver.register("image", FileStrategy);
        resolver.register("entity_reference", EntityReferenceStrategy);
        resolver.register("composite", CompositeStrategy);

        resolver
    }

    /// Resolver with no tag-specific strategies
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
            fallback: Box::new(DefaultStrategy),
            markup: Box::new(PassthroughMarkup),
            files: None,
        }
    }

    /// Register (or replace) the strategy for a value-shape tag
    pub fn register(&mut self, tag: impl Into<String>, strategy: impl ValueStrategy + 'static) {
        self.strategies.insert(tag.into(), Box::new(strategy));
    }

    pub fn with_markup(mut self, markup: impl MarkupRenderer + 'static) -> Self {
        self.markup = Box::new(markup);
        self
    }

    pub fn with_files(mut self, files: impl FileUrlGenerator + 'static) -> Self {
        self.files = Some(Box::new(files));
        self
    }

    pub fn has_strategy(&self, tag: &str) -> bool {
        self.strategies.contains_key(tag)
    }

    pub fn strategy_for(&self, tag: &str) -> &dyn ValueStrategy {
        match self.strategies.get(tag) {
            Some(strategy) => strategy.as_ref(),
            None => {
                debug!("No strategy for value shape '{}', using default", tag);
                self.fallback.as_ref()
            }
        }
    }

    pub fn markup(&self) -> &dyn MarkupRenderer {
        self.markup.as_ref()
    }

    pub fn files(&self) -> Option<&dyn FileUrlGenerator> {
        self.files.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Integer,
    Float,
    Boolean,
}

/// Plain values: trimmed strings, numbers kept numeric, booleans kept boolean
#[derive(Debug, Clone, Copy)]
pub struct ScalarStrategy(pub ScalarKind);

impl ValueStrategy for ScalarStrategy {
    fn resolve(&self, _cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value> {
        let value = main_value(item);
        match self.0 {
            ScalarKind::Text => text_value(value),
            ScalarKind::Integer => integer_value(value),
            ScalarKind::Float => float_value(value),
            ScalarKind::Boolean => boolean_value(value),
        }
    }
}

/// Links and URIs as absolute URLs; `entity:<type>/<id>` targets use the record's URL
#[derive(Debug, Clone, Copy)]
pub struct LinkStrategy;

impl ValueStrategy for LinkStrategy {
    fn resolve(&self, cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value> {
        let raw = match item {
            Value::Object(obj) => obj.get("uri").or_else(|| obj.get("value"))?.as_str()?,
            Value::String(s) => s.as_str(),
            _ => return None,
        };

        if let Some(route) = raw.trim().strip_prefix("entity:") {
            let target = RecordRef::parse(route)?;
            return cx.reference_url(&target).map(Value::String);
        }

        absolute_url(raw, cx.options().base().as_ref()).map(Value::String)
    }
}

/// Rich text passed through the markup renderer
#[derive(Debug, Clone, Copy)]
pub struct RichTextStrategy;

impl ValueStrategy for RichTextStrategy {
    fn resolve(&self, cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value> {
        let text = main_value(item).as_str()?;
        let format = item.get("format").and_then(Value::as_str);
        let rendered = cx.markup().render(text, format);
        non_empty_string(&rendered)
    }
}

/// Dates and timestamps in the fixed `YYYY-MM-DD HH:MM:SS ±HHMM` form
#[derive(Debug, Clone, Copy)]
pub struct DateTimeStrategy;

impl ValueStrategy for DateTimeStrategy {
    fn resolve(&self, cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value> {
        let value = main_value(item);
        let offset = FixedOffset::east_opt(cx.options().utc_offset_seconds)?;
        match format_datetime(value, offset) {
            Some(formatted) => Some(Value::String(formatted)),
            None => {
                warn!(
                    "Unparseable date value {} in field '{}' of {}",
                    value,
                    cx.field.name,
                    cx.record.reference()
                );
                None
            }
        }
    }
}

/// Format a stored date/time (RFC 3339, naive UTC, date-only or unix seconds)
pub fn format_datetime(value: &Value, offset: FixedOffset) -> Option<String> {
    let from_timestamp = |secs: i64| -> Option<String> {
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(|dt| dt.with_timezone(&offset).format(DATETIME_FORMAT).to_string())
    };

    match value {
        Value::Number(n) => from_timestamp(n.as_i64()?),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&offset).format(DATETIME_FORMAT).to_string());
            }
            for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, pattern) {
                    let dt = Utc.from_utc_datetime(&naive).with_timezone(&offset);
                    return Some(dt.format(DATETIME_FORMAT).to_string());
                }
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Some(date.format("%Y-%m-%d").to_string());
            }
            if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                return from_timestamp(s.parse().ok()?);
            }
            None
        }
        _ => None,
    }
}

/// Address components mapped onto a PostalAddress object
#[derive(Debug, Clone, Copy)]
pub struct AddressStrategy;

impl ValueStrategy for AddressStrategy {
    fn resolve(&self, cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value> {
        let components = item.as_object()?;
        let address = postal_address(components)?;
        let table: Vec<&str> = ADDRESS_PROPERTIES.iter().map(|(_, p)| *p).collect();
        Some(Value::Object(sort_with_fallback(
            address,
            &cx.options().property_order,
            &table,
        )))
    }
}

/// Build a PostalAddress from address components; `None` if every part is empty
pub fn postal_address(components: &Map<String, Value>) -> Option<Map<String, Value>> {
    let mut properties: Map<String, Value> = Map::new();

    for (component, property) in ADDRESS_PROPERTIES {
        let Some(part) = components
            .get(*component)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|p| !p.is_empty())
        else {
            continue;
        };

        let joined = match properties.get(*property).and_then(Value::as_str) {
            Some(existing) => format!("{} {}", existing, part),
            None => part.to_string(),
        };
        properties.insert(property.to_string(), Value::String(joined));
    }

    if properties.is_empty() {
        return None;
    }

    let mut address = Map::new();
    address.insert(TYPE_KEY.to_string(), Value::String(POSTAL_ADDRESS_TYPE.to_string()));
    address.extend(properties);
    Some(address)
}

/// Files and images as absolute URLs, preferring a configured derivative
#[derive(Debug, Clone, Copy)]
pub struct FileStrategy;

impl ValueStrategy for FileStrategy {
    fn resolve(&self, cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value> {
        let uri = match item {
            Value::Object(obj) => obj.get("uri").or_else(|| obj.get("url"))?.as_str()?,
            Value::String(s) => s.as_str(),
            _ => return None,
        };

        let url = match cx.options().image_styles.get(cx.property) {
            Some(style) => cx
                .derivative_url(style, uri)
                .or_else(|| cx.file_url(uri)),
            None => cx.file_url(uri),
        };
        url.map(Value::String)
    }
}

/// References serialized recursively, or reduced to a label when unmapped
#[derive(Debug, Clone, Copy)]
pub struct EntityReferenceStrategy;

impl ValueStrategy for EntityReferenceStrategy {
    fn resolve(&self, cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value> {
        let target = reference_target(item, cx.field.target_type.as_deref())?;
        cx.resolve_reference(&target)
    }
}

/// Structured items typed from their own `@type` or the property's range
#[derive(Debug, Clone, Copy)]
pub struct CompositeStrategy;

impl ValueStrategy for CompositeStrategy {
    fn resolve(&self, cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value> {
        let Some(obj) = item.as_object() else {
            return text_value(item);
        };

        let schema_type = obj
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| cx.vocabulary().default_range_type(cx.property));
        let Some(schema_type) = schema_type else {
            debug!(
                "No structured range type for property '{}', dropping composite value",
                cx.property
            );
            return None;
        };

        let mut result = Map::new();
        for (key, value) in obj {
            if key == TYPE_KEY {
                continue;
            }
            let value = match value {
                Value::String(s) => non_empty_string(s),
                Value::Null => None,
                other => Some(other.clone()),
            };
            if let Some(value) = value {
                result.insert(key.clone(), value);
            }
        }
        if result.is_empty() {
            return None;
        }

        result.insert(TYPE_KEY.to_string(), Value::String(schema_type));
        Some(Value::Object(sort_properties(
            result,
            &cx.options().property_order,
        )))
    }
}

/// Main value unmodified; nested record references become their label
#[derive(Debug, Clone, Copy)]
pub struct DefaultStrategy;

impl ValueStrategy for DefaultStrategy {
    fn resolve(&self, cx: &mut ResolveContext<'_>, item: &Value) -> Option<Value> {
        if item.get("target_id").is_some() {
            let target = reference_target(item, cx.field.target_type.as_deref())?;
            return cx.reference_label(&target);
        }

        match main_value(item) {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            other => Some(other.clone()),
        }
    }
}

fn non_empty_string(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(Value::String(trimmed.to_string()))
    }
}

fn text_value(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => non_empty_string(s),
        Value::Number(_) | Value::Bool(_) => Some(value.clone()),
        _ => None,
    }
}

fn integer_value(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn float_value(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

fn boolean_value(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::Number(n) => n.as_i64().map(|n| Value::Bool(n != 0)),
        Value::String(s) => match s.trim() {
            "1" | "true" => Some(Value::Bool(true)),
            "0" | "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}
