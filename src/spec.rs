//! Specification nodes.
//!
//! Two views of the same wire format live here:
//!
//! - [`Node`] is the owned, typed form. It is what callers build by hand and
//!   what the resolver projects into. Its `type` is fixed at construction and
//!   the reserved keys can never end up in the property bag.
//! - [`NodeView`] borrows a raw JSON object. The pipeline walks these so a
//!   malformed tree can still be inspected end to end.
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SpecError;

pub const TYPE_KEY: &str = "type";
pub const CHILDREN_KEY: &str = "children";
pub const WHEN_KEY: &str = "when";
pub const CONDITIONAL_PROPS_KEY: &str = "conditionalProps";

/// Structural keys; everything else on a node object is a property.
pub const RESERVED_KEYS: [&str; 4] = [TYPE_KEY, CHILDREN_KEY, WHEN_KEY, CONDITIONAL_PROPS_KEY];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Property → (expression → value), both levels in declaration order.
pub type ConditionalProps = IndexMap<String, IndexMap<String, Value>>;

// ————————————————————————————————————————————————————————————————————————————
// OWNED NODES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Children>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    when: Option<String>,
    #[serde(
        default,
        rename = "conditionalProps",
        skip_serializing_if = "IndexMap::is_empty"
    )]
    conditional_props: ConditionalProps,
    #[serde(flatten)]
    properties: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Children {
    Text(String),
    Many(Vec<Child>),
    Single(Box<Node>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Child {
    Text(String),
    Node(Node),
}

impl Node {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            children: None,
            when: None,
            conditional_props: IndexMap::new(),
            properties: IndexMap::new(),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, SpecError> {
        crate::path_de::from_value_with_path(value)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(src: &str) -> Result<Self, SpecError> {
        crate::path_de::from_str_with_path(src)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Result<Self, SpecError> {
        let key = key.into();
        if is_reserved_key(&key) {
            return Err(SpecError::ReservedKey(key));
        }
        self.properties.insert(key, value);
        Ok(self)
    }

    pub fn with_children(mut self, children: Children) -> Self {
        self.children = Some(children);
        self
    }

    pub fn with_child(mut self, child: impl Into<Child>) -> Self {
        let child = child.into();
        self.children = Some(match self.children.take() {
            None => Children::Many(vec![child]),
            Some(Children::Many(mut xs)) => {
                xs.push(child);
                Children::Many(xs)
            }
            Some(Children::Single(node)) => Children::Many(vec![Child::Node(*node), child]),
            Some(Children::Text(text)) => Children::Many(vec![Child::Text(text), child]),
        });
        self
    }

    pub fn with_when(mut self, expr: impl Into<String>) -> Self {
        self.when = Some(expr.into());
        self
    }

    /// Append one `expression → value` entry for `property`. Entries keep
    /// insertion order, which is the order they are tried in.
    pub fn with_conditional(
        mut self,
        property: impl Into<String>,
        expr: impl Into<String>,
        value: Value,
    ) -> Result<Self, SpecError> {
        let property = property.into();
        if is_reserved_key(&property) && property != CHILDREN_KEY {
            return Err(SpecError::ReservedKey(property));
        }
        self.conditional_props
            .entry(property)
            .or_default()
            .insert(expr.into(), value);
        Ok(self)
    }

    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn children(&self) -> Option<&Children> {
        self.children.as_ref()
    }

    pub fn when(&self) -> Option<&str> {
        self.when.as_deref()
    }

    pub fn conditional_props(&self) -> &ConditionalProps {
        &self.conditional_props
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl Children {
    /// Child nodes in order; text children are skipped.
    pub fn nodes(&self) -> Vec<&Node> {
        match self {
            Children::Text(_) => Vec::new(),
            Children::Single(node) => vec![node.as_ref()],
            Children::Many(xs) => xs
                .iter()
                .filter_map(|c| match c {
                    Child::Node(n) => Some(n),
                    Child::Text(_) => None,
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Children::Text(text) => text.is_empty(),
            Children::Single(_) => false,
            Children::Many(xs) => xs.is_empty(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BORROWED VIEW
// ————————————————————————————————————————————————————————————————————————————

/// Read-only view over a JSON object that carries a string `type`.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    node_type: &'a str,
    raw: &'a Map<String, Value>,
}

impl<'a> NodeView<'a> {
    /// `None` unless `value` is an object with a string `type`.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        let raw = value.as_object()?;
        let node_type = raw.get(TYPE_KEY)?.as_str()?;
        Some(Self { node_type, raw })
    }

    pub fn node_type(&self) -> &'a str {
        self.node_type
    }

    pub fn raw(&self) -> &'a Map<String, Value> {
        self.raw
    }

    /// Non-reserved keys, in document order.
    pub fn properties(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        self.raw
            .iter()
            .filter(|(k, _)| !is_reserved_key(k))
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn property(&self, key: &str) -> Option<&'a Value> {
        if is_reserved_key(key) {
            return None;
        }
        self.raw.get(key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.property(key).is_some_and(|v| !v.is_null())
    }

    /// `children` as written; an explicit `null` counts as absent.
    pub fn children(&self) -> Option<&'a Value> {
        self.raw.get(CHILDREN_KEY).filter(|v| !v.is_null())
    }

    /// True when `children` holds something renderable: a node, a non-empty
    /// string, or a non-empty array.
    pub fn has_children(&self) -> bool {
        match self.children() {
            None => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(xs)) => !xs.is_empty(),
            Some(_) => true,
        }
    }

    pub fn when(&self) -> Option<&'a Value> {
        self.raw.get(WHEN_KEY)
    }

    pub fn conditional_props(&self) -> Option<&'a Value> {
        self.raw.get(CONDITIONAL_PROPS_KEY)
    }

    /// Parse into the owned form.
    pub fn to_node(&self) -> Result<Node, SpecError> {
        crate::path_de::from_value_with_path(&Value::Object(self.raw.clone()))
    }
}

/// Unwraps a page envelope `{ "version": .., "root": node }`. Returns the node
/// value and whether an envelope was present.
pub fn unwrap_page(document: &Value) -> (&Value, bool) {
    match document.as_object() {
        Some(obj) if !obj.contains_key(TYPE_KEY) && obj.contains_key("root") => {
            match obj.get("root") {
                Some(root) => (root, true),
                None => (document, false),
            }
        }
        _ => (document, false),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_flat_wire_form() {
        let node = Node::from_value(&json!({
            "type": "Button",
            "variant": "primary",
            "when": "state.ready",
            "conditionalProps": {"variant": {"state.a": "x", "state.b": "y"}},
            "children": "Go"
        }))
        .unwrap();
        assert_eq!(node.node_type(), "Button");
        assert_eq!(node.property("variant"), Some(&json!("primary")));
        assert_eq!(node.when(), Some("state.ready"));
        assert_eq!(node.children(), Some(&Children::Text("Go".into())));
        let keys: Vec<_> = node.conditional_props()["variant"].keys().cloned().collect();
        assert_eq!(keys, vec!["state.a", "state.b"]);
        assert!(node.property("type").is_none());
    }

    #[test]
    fn children_shapes() {
        let single = Node::from_value(&json!({"type": "Card", "children": {"type": "Text"}})).unwrap();
        assert!(matches!(single.children(), Some(Children::Single(_))));
        let many = Node::from_value(&json!({"type": "Card", "children": [{"type": "Text"}, "hi"]})).unwrap();
        let nodes = many.children().unwrap().nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].node_type(), "Text");
    }

    #[test]
    fn missing_type_reports_path() {
        let err = Node::from_str(r#"{"children": []}"#).unwrap_err();
        assert!(matches!(err, SpecError::Parse { .. }));
    }

    #[test]
    fn builder_rejects_reserved_keys() {
        let err = Node::new("Box").with_property("when", json!("x")).unwrap_err();
        assert!(matches!(err, SpecError::ReservedKey(k) if k == "when"));
        assert!(Node::new("Box").with_property("padding", json!(4)).is_ok());
    }

    #[test]
    fn builder_round_trips_to_wire_form() {
        let node = Node::new("Flex")
            .with_property("direction", json!("row"))
            .unwrap()
            .with_child(Node::new("Text"))
            .with_child("tail")
            .with_when("state.open");
        let value = node.to_value();
        assert_eq!(
            value,
            json!({"type": "Flex", "children": [{"type": "Text"}, "tail"], "when": "state.open", "direction": "row"})
        );
        assert_eq!(Node::from_value(&value).unwrap(), node);
    }

    #[test]
    fn view_skips_reserved_keys_and_null_children() {
        let raw = json!({"type": "Grid", "columns": 3, "children": null, "when": "true"});
        let view = NodeView::from_value(&raw).unwrap();
        let keys: Vec<_> = view.properties().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["columns"]);
        assert!(view.children().is_none());
        assert!(!view.has_children());
        assert!(NodeView::from_value(&json!({"type": 3})).is_none());
    }

    #[test]
    fn page_envelope_is_unwrapped() {
        let page = json!({"version": "1.0", "root": {"type": "Box"}});
        let (root, wrapped) = unwrap_page(&page);
        assert!(wrapped);
        assert_eq!(root["type"], "Box");
        let bare = json!({"type": "Box", "root": 1});
        assert!(!unwrap_page(&bare).1);
    }
}
