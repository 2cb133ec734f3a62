//! Kind and property declarations.
//!
//! A [`Schema`] lists every node kind a model may contain and, per kind,
//! the properties it carries. Models check every mutation against it, so
//! a rule or normalizer can never create a property the domain does not
//! have.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The value range of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Range {
    Text,
    Integer,
    Boolean,
    /// A reference to another node of the same model.
    Reference,
}

impl Range {
    pub fn is_reference(self) -> bool {
        matches!(self, Range::Reference)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Range::Text => "text",
            Range::Integer => "integer",
            Range::Boolean => "boolean",
            Range::Reference => "reference",
        };
        f.write_str(name)
    }
}

/// A single property declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub range: Range,
    /// Multi-valued properties hold a set of values.
    pub multi: bool,
}

/// A node kind and its properties, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindDef {
    pub name: String,
    properties: IndexMap<String, PropertyDef>,
}

impl KindDef {
    pub fn new(name: impl Into<String>) -> Self {
        KindDef {
            name: name.into(),
            properties: IndexMap::new(),
        }
    }

    /// Declares a single-valued property.
    pub fn single(self, name: &str, range: Range) -> Self {
        self.with(name, range, false)
    }

    /// Declares a multi-valued property.
    pub fn multi(self, name: &str, range: Range) -> Self {
        self.with(name, range, true)
    }

    fn with(mut self, name: &str, range: Range, multi: bool) -> Self {
        self.properties.insert(
            name.to_string(),
            PropertyDef {
                name: name.to_string(),
                range,
                multi,
            },
        );
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.values()
    }
}

/// Registry of node kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    kinds: IndexMap<String, KindDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a kind declaration.
    pub fn with_kind(mut self, kind: KindDef) -> Self {
        self.insert(kind);
        self
    }

    pub fn insert(&mut self, kind: KindDef) {
        self.kinds.insert(kind.name.clone(), kind);
    }

    pub fn kind(&self, name: &str) -> Option<&KindDef> {
        self.kinds.get(name)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &KindDef> {
        self.kinds.values()
    }

    /// Looks up a kind, failing with [`CoreError::UnknownKind`].
    pub fn require_kind(&self, kind: &str) -> Result<&KindDef, CoreError> {
        self.kind(kind).ok_or_else(|| CoreError::UnknownKind {
            kind: kind.to_string(),
        })
    }

    /// Looks up a property of a kind, failing with
    /// [`CoreError::UnknownKind`] or [`CoreError::UnknownProperty`].
    pub fn require_property(&self, kind: &str, property: &str) -> Result<&PropertyDef, CoreError> {
        self.require_kind(kind)?
            .property(property)
            .ok_or_else(|| CoreError::UnknownProperty {
                kind: kind.to_string(),
                property: property.to_string(),
            })
    }

    /// Kinds that declare `property`.
    pub fn kinds_with(&self, property: &str) -> Vec<&str> {
        self.kinds
            .values()
            .filter(|k| k.property(property).is_some())
            .map(|k| k.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new()
            .with_kind(
                KindDef::new("UnificationRef")
                    .single("db", Range::Text)
                    .single("id", Range::Text)
                    .multi("comment", Range::Text),
            )
            .with_kind(KindDef::new("Protein").multi("xref", Range::Reference))
    }

    #[test]
    fn require_property_finds_declared() {
        let schema = schema();
        let def = schema.require_property("UnificationRef", "db").unwrap();
        assert_eq!(def.range, Range::Text);
        assert!(!def.multi);
        assert!(schema.require_property("Protein", "xref").unwrap().multi);
    }

    #[test]
    fn require_property_rejects_unknown() {
        let schema = schema();
        assert!(matches!(
            schema.require_property("Protein", "db"),
            Err(CoreError::UnknownProperty { .. })
        ));
        assert!(matches!(
            schema.require_property("Gene", "db"),
            Err(CoreError::UnknownKind { .. })
        ));
    }

    #[test]
    fn kinds_with_lists_declaring_kinds() {
        let schema = schema();
        assert_eq!(schema.kinds_with("xref"), vec!["Protein"]);
        assert!(schema.kinds_with("organism").is_empty());
    }

    #[test]
    fn properties_keep_declaration_order() {
        let schema = schema();
        let names: Vec<&str> = schema
            .kind("UnificationRef")
            .unwrap()
            .properties()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["db", "id", "comment"]);
    }
}
