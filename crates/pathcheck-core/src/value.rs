//! Property values and the slots that hold them.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::NodeId;
use crate::schema::Range;

/// A single property value. Enumerations are carried as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Ref(NodeId),
}

impl Value {
    /// The range this value belongs to.
    pub fn range(&self) -> Range {
        match self {
            Value::Text(_) => Range::Text,
            Value::Integer(_) => Range::Integer,
            Value::Boolean(_) => Range::Boolean,
            Value::Ref(_) => Range::Reference,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// Blank text counts as "no value" for fill-if-absent semantics.
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Ref(id) => write!(f, "#{id}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Ref(id)
    }
}

/// The stored values of one property on one node.
///
/// Multi-valued slots have set semantics: inserting a value that is
/// already present is a no-op. Insertion order is kept so output stays
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    multi: bool,
    values: SmallVec<[Value; 1]>,
}

impl Slot {
    pub fn new(multi: bool) -> Self {
        Slot {
            multi,
            values: SmallVec::new(),
        }
    }

    pub fn is_multi(&self) -> bool {
        self.multi
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Value::is_blank)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }

    /// Referenced node ids, in slot order.
    pub fn refs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.values.iter().filter_map(Value::as_node)
    }

    /// Text values, in slot order.
    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.iter().filter_map(Value::as_text)
    }

    /// Adds a value; returns `false` if it was already present.
    ///
    /// On a single-valued slot this replaces the current value.
    pub(crate) fn insert(&mut self, value: Value) -> bool {
        if self.values.contains(&value) {
            return false;
        }
        if !self.multi {
            self.values.clear();
        }
        self.values.push(value);
        true
    }

    pub(crate) fn remove(&mut self, value: &Value) -> bool {
        let before = self.values.len();
        self.values.retain(|v| v != value);
        before != self.values.len()
    }

    /// Replaces all values, dropping duplicates (first occurrence wins).
    pub(crate) fn replace(&mut self, values: impl IntoIterator<Item = Value>) {
        self.values.clear();
        for value in values {
            if !self.values.contains(&value) {
                self.values.push(value);
            }
        }
        if !self.multi {
            self.values.truncate(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_slot_has_set_semantics() {
        let mut slot = Slot::new(true);
        assert!(slot.insert("a".into()));
        assert!(slot.insert("b".into()));
        assert!(!slot.insert("a".into()));
        assert_eq!(slot.len(), 2);
    }

    #[test]
    fn single_slot_insert_replaces() {
        let mut slot = Slot::new(false);
        slot.insert("a".into());
        slot.insert("b".into());
        assert_eq!(slot.values(), &[Value::from("b")]);
    }

    #[test]
    fn replace_dedupes_in_order() {
        let mut slot = Slot::new(true);
        slot.replace(vec![
            Value::Ref(NodeId(2)),
            Value::Ref(NodeId(1)),
            Value::Ref(NodeId(2)),
        ]);
        assert_eq!(slot.refs().collect::<Vec<_>>(), vec![NodeId(2), NodeId(1)]);
    }

    #[test]
    fn blank_text_slot_is_empty() {
        let mut slot = Slot::new(false);
        assert!(slot.is_empty());
        slot.insert("  ".into());
        assert!(slot.is_empty());
        slot.insert("x".into());
        assert!(!slot.is_empty());
    }

    #[test]
    fn value_serializes_tagged() {
        let json = serde_json::to_string(&Value::Ref(NodeId(3))).unwrap();
        assert_eq!(json, r#"{"type":"ref","value":3}"#);
    }
}
