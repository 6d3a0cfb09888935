//! Conditional properties and the render projection.
//!
//! Everything here is a pure function of `(node, state)`: nothing is cached
//! and the node is never mutated, so hosts simply re-run it on every state
//! change.
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::expr::{self, EvalContext};
use crate::spec::{CHILDREN_KEY, Child, Children, Node};

/// A node after `when` and `conditionalProps` have been applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(flatten)]
    pub properties: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResolvedChild>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedChild {
    Text(String),
    Node(ResolvedNode),
}

/// Active overrides: for each property, the value of the first expression
/// that is truthy. Properties with no match are absent.
pub fn resolve_conditional_props(node: &Node, state: &Value) -> IndexMap<String, Value> {
    resolve_in(node, &EvalContext::new(state))
}

pub fn resolve_in(node: &Node, ctx: &EvalContext<'_>) -> IndexMap<String, Value> {
    let mut overrides = IndexMap::new();
    for (property, candidates) in node.conditional_props() {
        let winner = candidates
            .iter()
            .find(|(condition, _)| expr::condition_in(condition, ctx));
        if let Some((_, value)) = winner {
            overrides.insert(property.clone(), value.clone());
        }
    }
    overrides
}

/// Static properties with the active overrides laid on top. A `children`
/// override is not a property and is left to [`project`].
pub fn effective_properties(node: &Node, state: &Value) -> IndexMap<String, Value> {
    effective_in(node, &EvalContext::new(state))
}

pub fn effective_in(node: &Node, ctx: &EvalContext<'_>) -> IndexMap<String, Value> {
    let mut properties = node.properties().clone();
    for (key, value) in resolve_in(node, ctx) {
        if key != CHILDREN_KEY {
            properties.insert(key, value);
        }
    }
    properties
}

/// `when` evaluated fail-closed; a node without `when` is visible.
pub fn is_visible(node: &Node, state: &Value) -> bool {
    visible_in(node, &EvalContext::new(state))
}

pub fn visible_in(node: &Node, ctx: &EvalContext<'_>) -> bool {
    node.when().is_none_or(|condition| expr::condition_in(condition, ctx))
}

/// The render pass: drops invisible nodes (and their subtrees), applies
/// overrides, and recurses into children. `None` when `node` itself is hidden.
pub fn project(node: &Node, state: &Value) -> Option<ResolvedNode> {
    project_in(node, &EvalContext::new(state))
}

pub fn project_in(node: &Node, ctx: &EvalContext<'_>) -> Option<ResolvedNode> {
    if !visible_in(node, ctx) {
        return None;
    }
    let overrides = resolve_in(node, ctx);
    let children_override = overrides.get(CHILDREN_KEY).and_then(children_from_override);

    let mut properties = node.properties().clone();
    for (key, value) in overrides {
        if key != CHILDREN_KEY {
            properties.insert(key, value);
        }
    }

    let children = match children_override.as_ref().or(node.children()) {
        None => Vec::new(),
        Some(Children::Text(text)) => vec![ResolvedChild::Text(text.clone())],
        Some(Children::Single(child)) => project_in(child, ctx)
            .map(ResolvedChild::Node)
            .into_iter()
            .collect(),
        Some(Children::Many(xs)) => xs
            .iter()
            .filter_map(|child| match child {
                Child::Text(text) => Some(ResolvedChild::Text(text.clone())),
                Child::Node(n) => project_in(n, ctx).map(ResolvedChild::Node),
            })
            .collect(),
    };

    Some(ResolvedNode {
        node_type: node.node_type().to_string(),
        properties,
        children,
    })
}

fn children_from_override(value: &Value) -> Option<Children> {
    match serde_json::from_value::<Children>(value.clone()) {
        Ok(children) => Some(children),
        Err(error) => {
            tracing::warn!(%error, "ignoring conditional `children` that is not text or nodes");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(value: Value) -> Node {
        Node::from_value(&value).unwrap()
    }

    #[test]
    fn first_truthy_expression_wins() {
        let n = node(json!({
            "type": "Button",
            "conditionalProps": {"variant": {"state.a": "x", "state.b": "y"}}
        }));
        let state = json!({"a": true, "b": true});
        let first = resolve_conditional_props(&n, &state);
        assert_eq!(first.get("variant"), Some(&json!("x")));
        assert_eq!(first, resolve_conditional_props(&n, &state));

        let only_b = json!({"a": false, "b": true});
        assert_eq!(resolve_conditional_props(&n, &only_b).get("variant"), Some(&json!("y")));
    }

    #[test]
    fn no_match_falls_back_to_static() {
        let n = node(json!({
            "type": "Button",
            "variant": "ghost",
            "conditionalProps": {"variant": {"state.a": "x"}, "size": {"state.big": "lg"}}
        }));
        let state = json!({});
        assert!(resolve_conditional_props(&n, &state).is_empty());
        let props = effective_properties(&n, &state);
        assert_eq!(props.get("variant"), Some(&json!("ghost")));
        assert!(props.get("size").is_none());

        let props = effective_properties(&n, &json!({"a": 1, "big": true}));
        assert_eq!(props.get("variant"), Some(&json!("x")));
        assert_eq!(props.get("size"), Some(&json!("lg")));
    }

    #[test]
    fn malformed_condition_never_matches() {
        let n = node(json!({
            "type": "Text",
            "conditionalProps": {"tone": {"state.x ===": "loud", "true": "calm"}}
        }));
        assert_eq!(resolve_conditional_props(&n, &json!({"x": 1})).get("tone"), Some(&json!("calm")));
    }

    #[test]
    fn visibility() {
        let shown = node(json!({"type": "Box"}));
        let guarded = node(json!({"type": "Box", "when": "state.open"}));
        let broken = node(json!({"type": "Box", "when": "state.open &&"}));
        assert!(is_visible(&shown, &json!({})));
        assert!(is_visible(&guarded, &json!({"open": true})));
        assert!(!is_visible(&guarded, &json!({"open": false})));
        assert!(!is_visible(&broken, &json!({"open": true})));
    }

    #[test]
    fn projection_drops_hidden_nodes_and_applies_overrides() {
        let tree = node(json!({
            "type": "Container",
            "children": [
                {"type": "Text", "children": "always"},
                {"type": "Text", "when": "state.admin", "children": "admin only"},
                {"type": "Button",
                 "variant": "ghost",
                 "conditionalProps": {"variant": {"state.admin": "primary"}},
                 "children": "Go"}
            ]
        }));
        let out = project(&tree, &json!({"admin": false})).unwrap();
        assert_eq!(out.children.len(), 2);
        let wire = serde_json::to_value(&out).unwrap();
        assert_eq!(
            wire,
            json!({"type": "Container", "children": [
                {"type": "Text", "children": ["always"]},
                {"type": "Button", "variant": "ghost", "children": ["Go"]}
            ]})
        );

        let admin = serde_json::to_value(project(&tree, &json!({"admin": true})).unwrap()).unwrap();
        assert_eq!(admin["children"].as_array().unwrap().len(), 3);
        assert_eq!(admin["children"][2]["variant"], "primary");
    }

    #[test]
    fn hidden_root_projects_to_none() {
        let tree = node(json!({"type": "Box", "when": "state.ready"}));
        assert!(project(&tree, &json!({})).is_none());
    }

    #[test]
    fn children_override() {
        let tree = node(json!({
            "type": "Text",
            "children": "Loading",
            "conditionalProps": {"children": {"state.done": "Done"}}
        }));
        let out = project(&tree, &json!({"done": true})).unwrap();
        assert_eq!(out.children, vec![ResolvedChild::Text("Done".into())]);
        assert!(effective_properties(&tree, &json!({"done": true})).get("children").is_none());
    }
}
