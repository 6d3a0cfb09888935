//! Depth-first, pre-order traversal over a raw specification tree.
//!
//! Nodes are found in `children`, in property values (a node, or arrays of
//! nodes at any depth) and in `conditionalProps` values. Positions where a
//! node was expected but something else sits are reported as
//! [`InvalidSite`]s instead of being skipped.
use serde_json::Value;

use crate::diagnostic::SpecPath;
use crate::spec::{CHILDREN_KEY, CONDITIONAL_PROPS_KEY, NodeView, TYPE_KEY, WHEN_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidKind {
    /// The document (or the page envelope's `root`) is not a node.
    Root,
    /// An entry of `children` is neither text nor a node.
    Child,
    /// `children` itself is a scalar that cannot be rendered.
    Children,
}

#[derive(Debug, Clone, Copy)]
pub struct InvalidSite<'v> {
    pub kind: InvalidKind,
    pub value: &'v Value,
}

pub enum Visit<'v> {
    Node(NodeView<'v>),
    Invalid(InvalidSite<'v>),
}

/// Calls `f` for every node and invalid site, parents before children, with
/// the type names of the enclosing nodes.
pub fn walk<'v, F>(root: &'v Value, root_path: SpecPath, f: &mut F)
where
    F: FnMut(Visit<'v>, &SpecPath, &[&'v str]),
{
    let mut ancestors = Vec::new();
    match NodeView::from_value(root) {
        Some(node) => visit_node(node, &root_path, &mut ancestors, f),
        None => {
            let site = InvalidSite { kind: InvalidKind::Root, value: root };
            f(Visit::Invalid(site), &root_path, &ancestors);
        }
    }
}

fn visit_node<'v, F>(node: NodeView<'v>, path: &SpecPath, ancestors: &mut Vec<&'v str>, f: &mut F)
where
    F: FnMut(Visit<'v>, &SpecPath, &[&'v str]),
{
    f(Visit::Node(node), path, ancestors);
    ancestors.push(node.node_type());

    for (key, value) in node.raw() {
        match key.as_str() {
            TYPE_KEY | WHEN_KEY => {}
            CHILDREN_KEY => visit_children(value, &path.join(CHILDREN_KEY), ancestors, f),
            CONDITIONAL_PROPS_KEY => {
                let Some(props) = value.as_object() else { continue };
                let base = path.join(CONDITIONAL_PROPS_KEY);
                for (prop, entries) in props {
                    let Some(entries) = entries.as_object() else { continue };
                    let prop_path = base.join(prop.as_str());
                    for (expr, candidate) in entries {
                        visit_nested(candidate, &prop_path.join(expr.as_str()), ancestors, f);
                    }
                }
            }
            _ => visit_nested(value, &path.join(key.as_str()), ancestors, f),
        }
    }

    ancestors.pop();
}

fn visit_children<'v, F>(value: &'v Value, path: &SpecPath, ancestors: &mut Vec<&'v str>, f: &mut F)
where
    F: FnMut(Visit<'v>, &SpecPath, &[&'v str]),
{
    match value {
        Value::Null | Value::String(_) | Value::Number(_) => {}
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let item_path = path.join(i);
                match item {
                    Value::Null | Value::String(_) | Value::Number(_) => {}
                    _ => match NodeView::from_value(item) {
                        Some(child) => visit_node(child, &item_path, ancestors, f),
                        None => {
                            let site = InvalidSite { kind: InvalidKind::Child, value: item };
                            f(Visit::Invalid(site), &item_path, ancestors);
                        }
                    },
                }
            }
        }
        Value::Object(_) => match NodeView::from_value(value) {
            Some(child) => visit_node(child, path, ancestors, f),
            None => {
                let site = InvalidSite { kind: InvalidKind::Child, value };
                f(Visit::Invalid(site), path, ancestors);
            }
        },
        Value::Bool(_) => {
            let site = InvalidSite { kind: InvalidKind::Children, value };
            f(Visit::Invalid(site), path, ancestors);
        }
    }
}

/// Property values: nodes are visited, arrays are searched at any depth,
/// everything else is data.
fn visit_nested<'v, F>(value: &'v Value, path: &SpecPath, ancestors: &mut Vec<&'v str>, f: &mut F)
where
    F: FnMut(Visit<'v>, &SpecPath, &[&'v str]),
{
    if let Some(node) = NodeView::from_value(value) {
        visit_node(node, path, ancestors, f);
    } else if let Value::Array(items) = value {
        for (i, item) in items.iter().enumerate() {
            visit_nested(item, &path.join(i), ancestors, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trace(tree: &Value) -> Vec<(String, String, usize)> {
        let mut out = Vec::new();
        walk(tree, SpecPath::root(), &mut |visit, path, ancestors| {
            let label = match visit {
                Visit::Node(n) => n.node_type().to_string(),
                Visit::Invalid(site) => format!("invalid:{:?}", site.kind),
            };
            out.push((label, path.to_string(), ancestors.len()));
        });
        out
    }

    #[test]
    fn pre_order_in_key_order() {
        let tree = json!({
            "type": "Page",
            "header": {"type": "Header"},
            "children": [
                {"type": "A", "children": {"type": "A1"}},
                "text",
                {"type": "B"}
            ],
            "slots": [[{"type": "S"}], {"plain": true}],
            "conditionalProps": {"icon": {"state.x": {"type": "Icon"}, "state.y": "none"}}
        });
        let seen: Vec<_> = trace(&tree).into_iter().map(|(l, p, d)| format!("{l}@{p}#{d}")).collect();
        assert_eq!(
            seen,
            vec![
                "Page@(root)#0",
                "Header@header#1",
                "A@children.0#1",
                "A1@children.0.children#2",
                "B@children.2#1",
                "S@slots.0.0#1",
                "Icon@conditionalProps.icon.state.x#1",
            ]
        );
    }

    #[test]
    fn reports_invalid_sites() {
        let tree = json!({
            "type": "Box",
            "children": [42, {"label": "no type"}, true, null, {"type": "Ok", "children": false}]
        });
        let labels: Vec<_> = trace(&tree).into_iter().map(|(l, p, _)| format!("{l}@{p}")).collect();
        assert_eq!(
            labels,
            vec![
                "Box@(root)",
                "invalid:Child@children.1",
                "invalid:Child@children.2",
                "Ok@children.4",
                "invalid:Children@children.4.children",
            ]
        );
    }

    #[test]
    fn non_node_root() {
        let labels = trace(&json!([1, 2]));
        assert_eq!(labels, vec![("invalid:Root".to_string(), "(root)".to_string(), 0)]);
    }
}
