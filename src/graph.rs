//! Traversal queries over the vocabulary graph
//!
//! Subtype closure, enumeration discovery, multi-parent breadcrumbs and
//! type trees. Every query tolerates unknown identifiers by returning an
//! empty result; vocabulary and mapping configuration drift independently.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::store::VocabularyStore;
use crate::vocab::{DATA_TYPE, ENUMERATION_TYPE};

/// Nested subtype/enumeration tree keyed by type id
pub type TypeTree = BTreeMap<String, TypeTreeNode>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeTreeNode {
    pub subtypes: TypeTree,
    pub enumerations: TypeTree,
}

/// Split a comma separated identifier list ("Thing, Place")
pub fn parse_ids(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

impl VocabularyStore {
    /// Direct children of a type: its subtypes and its enumeration members
    pub fn type_children(&self, id: &str) -> Vec<String> {
        let mut children: Vec<String> = self
            .subtypes_of(id)
            .iter()
            .chain(self.members_of(id))
            .cloned()
            .collect();
        children.sort();
        children.dedup();
        children
    }

    /// Direct subtypes of the given types, excluding enumeration members
    pub fn sub_types(&self, ids: &[&str]) -> BTreeSet<String> {
        ids.iter()
            .flat_map(|id| self.subtypes_of(id).iter().cloned())
            .collect()
    }

    /// Direct enumeration members of the given types
    pub fn enumeration_members(&self, ids: &[&str]) -> BTreeSet<String> {
        ids.iter()
            .flat_map(|id| self.members_of(id).iter().cloned())
            .collect()
    }

    /// Transitive closure of subtypes (and enumeration members), seeds included
    pub fn all_sub_types(&self, ids: &[&str]) -> BTreeSet<String> {
        let mut closure: BTreeSet<String> = BTreeSet::new();
        let mut frontier: VecDeque<String> = VecDeque::new();

        for id in ids {
            if self.is_type(id) && closure.insert(id.to_string()) {
                frontier.push_back(id.to_string());
            }
        }

        while let Some(current) = frontier.pop_front() {
            for child in self.subtypes_of(&current).iter().chain(self.members_of(&current)) {
                if closure.insert(child.clone()) {
                    frontier.push_back(child.clone());
                }
            }
        }

        closure
    }

    /// Enumeration members of every type in the subtype closure
    pub fn all_enumeration_members(&self, ids: &[&str]) -> BTreeSet<String> {
        let closure = self.all_sub_types(ids);
        closure
            .iter()
            .flat_map(|id| self.members_of(id).iter().cloned())
            .collect()
    }

    /// Every type reachable through parent links, the type itself included
    pub fn ancestors(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![id.to_string()];

        while let Some(current) = stack.pop() {
            let Some(node) = self.get_type(&current) else {
                continue;
            };
            if !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(node.parent_ids().into_iter().map(String::from));
        }

        seen
    }

    /// All root-to-type paths, keyed by their `/`-joined form
    ///
    /// Each parent of a multi-parent type starts its own chain back to the
    /// root. Panics if the parent graph contains a cycle; stores built with
    /// [`VocabularyStore::new`] are validated against that.
    pub fn type_breadcrumbs(&self, id: &str) -> BTreeMap<String, Vec<String>> {
        if !self.is_type(id) {
            return BTreeMap::new();
        }

        let mut on_path = Vec::new();
        self.paths_to(id, &mut on_path)
            .into_iter()
            .map(|path| (path.join("/"), path))
            .collect()
    }

    fn paths_to(&self, id: &str, on_path: &mut Vec<String>) -> Vec<Vec<String>> {
        if on_path.iter().any(|seen| seen == id) {
            panic!(
                "inconsistent vocabulary: type '{}' is its own ancestor (path {})",
                id,
                on_path.join(" <- ")
            );
        }
        let Some(node) = self.get_type(id) else {
            return Vec::new();
        };

        let parents: Vec<&str> = node
            .parent_ids()
            .into_iter()
            .filter(|parent| self.is_type(parent))
            .collect();
        if parents.is_empty() {
            return vec![vec![id.to_string()]];
        }

        on_path.push(id.to_string());
        let mut paths = Vec::new();
        for parent in parents {
            for mut path in self.paths_to(parent, on_path) {
                path.push(id.to_string());
                paths.push(path);
            }
        }
        on_path.pop();
        paths
    }

    /// Recursive subtype/enumeration tree below the given types
    pub fn type_tree(&self, ids: &[&str], ignore: &[&str]) -> TypeTree {
        let mut tree = TypeTree::new();
        for id in ids {
            if self.is_type(id) && !ignore.contains(id) {
                tree.insert(id.to_string(), self.tree_node(id, ignore));
            }
        }
        tree
    }

    fn tree_node(&self, id: &str, ignore: &[&str]) -> TypeTreeNode {
        let branch = |children: &[String]| -> TypeTree {
            children
                .iter()
                .filter(|child| !ignore.contains(&child.as_str()))
                .map(|child| (child.clone(), self.tree_node(child, ignore)))
                .collect()
        };

        TypeTreeNode {
            subtypes: branch(self.subtypes_of(id)),
            enumerations: branch(self.members_of(id)),
        }
    }

    /// True if the type is, or descends from, any of the candidate ancestors
    pub fn is_subtype_of(&self, id: &str, ancestors: &[&str]) -> bool {
        let lineage = self.ancestors(id);
        ancestors.iter().any(|candidate| lineage.contains(*candidate))
    }

    /// Properties declared on the type or any of its ancestors
    pub fn type_properties(&self, id: &str) -> BTreeSet<String> {
        self.ancestors(id)
            .iter()
            .filter_map(|ancestor| self.get_type(ancestor))
            .flat_map(|node| node.properties.iter().cloned())
            .collect()
    }

    pub fn has_property(&self, type_id: &str, property: &str) -> bool {
        self.ancestors(type_id).iter().any(|ancestor| {
            self.get_type(ancestor)
                .map(|node| node.properties.iter().any(|p| p == property))
                .unwrap_or(false)
        })
    }

    pub fn is_enumeration_type(&self, id: &str) -> bool {
        self.is_subtype_of(id, &[ENUMERATION_TYPE])
    }

    pub fn is_enumeration_value(&self, id: &str) -> bool {
        self.get_type(id)
            .map(|node| node.enumeration_type.is_some())
            .unwrap_or(false)
    }

    /// True for primitive value types (Text, Number, Date, ...)
    pub fn is_data_type(&self, id: &str) -> bool {
        self.is_subtype_of(id, &[DATA_TYPE])
    }

    pub fn is_superseded(&self, id: &str) -> bool {
        self.get_type(id)
            .map(|node| node.superseded_by.is_some())
            .or_else(|| {
                self.get_property(id)
                    .map(|node| node.superseded_by.is_some())
            })
            .unwrap_or(false)
    }

    /// Range types of a property, as declared
    pub fn property_range_includes(&self, property: &str) -> Vec<String> {
        self.get_property(property)
            .map(|node| node.range_includes.clone())
            .unwrap_or_default()
    }

    /// First structural (non data type) range type of a property, alphabetically
    pub fn default_range_type(&self, property: &str) -> Option<String> {
        let mut candidates: Vec<String> = self
            .property_range_includes(property)
            .into_iter()
            .filter(|range| self.is_type(range) && !self.is_data_type(range))
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }
}
