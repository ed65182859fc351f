//! Deterministic property ordering for emitted objects
//!
//! `@context`, `@type`, `@url` and `identifier` always lead. Properties named
//! in the explicit order follow in that order, then everything else sorted
//! alphabetically (or by a fallback table for composite values).

use serde_json::{Map, Value};

use crate::vocab::LEADING_KEYS;

/// Reorder an object: leading keys, explicit order, then alphabetical
pub fn sort_properties(object: Map<String, Value>, explicit: &[String]) -> Map<String, Value> {
    sort_with_fallback(object, explicit, &[])
}

/// Like [`sort_properties`], but remaining keys listed in `fallback` keep the
/// fallback's order and come before any alphabetically sorted stragglers
pub fn sort_with_fallback(
    object: Map<String, Value>,
    explicit: &[String],
    fallback: &[&str],
) -> Map<String, Value> {
    let mut entries: Vec<(String, Value)> = object.into_iter().collect();

    entries.sort_by(|(a, _), (b, _)| {
        rank(a, explicit, fallback)
            .cmp(&rank(b, explicit, fallback))
            .then_with(|| a.cmp(b))
    });

    entries.into_iter().collect()
}

fn rank(key: &str, explicit: &[String], fallback: &[&str]) -> (usize, usize) {
    if let Some(pos) = LEADING_KEYS.iter().position(|k| *k == key) {
        return (0, pos);
    }
    if let Some(pos) = explicit.iter().position(|k| k == key) {
        return (1, pos);
    }
    if let Some(pos) = fallback.iter().position(|k| *k == key) {
        return (2, pos);
    }
    (3, 0)
}
