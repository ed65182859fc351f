//! Vocabulary constants
//!
//! Identifiers and reserved JSON-LD keys shared by the store, the
//! serializer and the document assembler.

/// The value injected as `@context` into every top-level document
pub const SCHEMA_CONTEXT: &str = "https://schema.org";

/// Root of the structural type hierarchy
pub const ROOT_TYPE: &str = "Thing";

/// Root of the primitive-value branch (Text, Number, Date, ...)
pub const DATA_TYPE: &str = "DataType";

/// Parent of every enumeration type
pub const ENUMERATION_TYPE: &str = "Enumeration";

/// Property used to tag ordered items with a 1-based index
pub const POSITION_PROPERTY: &str = "position";

/// Property receiving injected identifiers
pub const IDENTIFIER_PROPERTY: &str = "identifier";

/// Type of an injected identifier value
pub const PROPERTY_VALUE_TYPE: &str = "PropertyValue";

/// Type produced by the address strategy
pub const POSTAL_ADDRESS_TYPE: &str = "PostalAddress";

pub const CONTEXT_KEY: &str = "@context";
pub const TYPE_KEY: &str = "@type";
pub const URL_KEY: &str = "@url";

/// Keys that always lead an emitted object, in this order
pub const LEADING_KEYS: [&str; 4] = [CONTEXT_KEY, TYPE_KEY, URL_KEY, IDENTIFIER_PROPERTY];

/// Record field holding a per-record subtype when the mapping enables subtyping
pub const SUBTYPE_FIELD: &str = "schema_subtype";

/// Key under which the serialized primary record is stored during assembly
pub const PRIMARY_ENTITY_KEY: &str = "entity";
