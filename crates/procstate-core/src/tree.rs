//! Tagged tree used for state snapshots.
//!
//! A [`StateNode`] is a tag, a set of string attributes and an ordered list of
//! children. Registry snapshots and data item payloads are both expressed as
//! nodes, and the binary codec serializes the whole tree with serde.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One node of a state tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateNode {
    /// Node type, e.g. `"state"`, `"PARAM"`, `"FILE"`.
    pub tag: String,
    /// String attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Child nodes, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StateNode>,
}

impl StateNode {
    /// Create an empty node with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: StateNode) -> Self {
        self.children.push(child);
        self
    }

    /// Whether the node carries this tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Attribute value, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute parsed as `f64`, if present, numeric and finite.
    ///
    /// `NaN` and the infinities parse as floats but are never valid values,
    /// so they read as `None`.
    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        self.attribute(name)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&StateNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// First child whose attribute `name` equals `value`.
    pub fn child_with_attribute(&self, name: &str, value: &str) -> Option<&StateNode> {
        self.children
            .iter()
            .find(|c| c.attribute(name) == Some(value))
    }

    /// Append a child.
    pub fn push(&mut self, child: StateNode) {
        self.children.push(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes() {
        let mut node = StateNode::new("PARAM")
            .with_attribute("id", "volume")
            .with_attribute("value", "1.5");
        assert_eq!(node.attribute("id"), Some("volume"));
        assert_eq!(node.attribute_f64("value"), Some(1.5));
        assert_eq!(node.attribute_f64("id"), None);
        assert_eq!(node.attribute("missing"), None);

        assert_eq!(node.remove_attribute("id").as_deref(), Some("volume"));
        assert_eq!(node.attribute("id"), None);
    }

    #[test]
    fn test_non_finite_attributes_are_not_numbers() {
        for text in ["NaN", "nan", "inf", "-inf", "infinity"] {
            let node = StateNode::new("PARAM").with_attribute("value", text);
            assert_eq!(node.attribute_f64("value"), None, "{text}");
        }
    }

    #[test]
    fn test_child_lookup() {
        let root = StateNode::new("state")
            .with_child(StateNode::new("parameters"))
            .with_child(
                StateNode::new("data")
                    .with_child(StateNode::new("FILE").with_attribute("__id", "a"))
                    .with_child(StateNode::new("FILE").with_attribute("__id", "b")),
            );

        assert!(root.child("parameters").is_some());
        assert!(root.child("missing").is_none());

        let data = root.child("data").unwrap();
        let b = data.child_with_attribute("__id", "b").unwrap();
        assert!(b.has_tag("FILE"));
        assert!(data.child_with_attribute("__id", "c").is_none());
    }

    #[test]
    fn test_json_shape_omits_empty_fields() {
        let node = StateNode::new("data");
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(json, r#"{"tag":"data"}"#);

        let parsed: StateNode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, node);
    }
}
