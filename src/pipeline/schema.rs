//! Structural checks against the component registry.
use serde_json::Value;

use super::walk::{InvalidKind, InvalidSite};
use super::{Stage, StageContext};
use crate::diagnostic::{Diagnostic, StageKind};
use crate::registry::{ComponentDescriptor, suggest};
use crate::spec::{CHILDREN_KEY, CONDITIONAL_PROPS_KEY, NodeView, WHEN_KEY};

const MAX_SUGGESTIONS: usize = 3;
const MAX_LISTED_TYPES: usize = 10;

/// Unknown types, unknown or missing properties, and malformed `when` /
/// `conditionalProps` / `children` shapes. Always Error severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaStage;

impl Stage for SchemaStage {
    fn name(&self) -> &str {
        "schema"
    }

    fn kind(&self) -> StageKind {
        StageKind::Schema
    }

    fn check_node(&self, node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        match cx.registry.lookup(node.node_type()) {
            None => out.push(unknown_type(node, cx)),
            Some(descriptor) => {
                check_properties(node, descriptor, cx, &mut out);
                check_required(node, descriptor, cx, &mut out);
            }
        }
        check_when(node, cx, &mut out);
        check_conditional_props(node, cx, &mut out);
        out
    }

    /// Child positions only; the root is the preprocessing stage's.
    fn check_invalid(&self, site: &InvalidSite<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
        let message = match (site.kind, site.value) {
            (InvalidKind::Root, _) => return Vec::new(),
            (InvalidKind::Children, _) => "children must be text, a component, or an array of components",
            (InvalidKind::Child, Value::Object(_)) => "Component specification must have a 'type' property",
            (InvalidKind::Child, _) => "Component specification must be an object",
        };
        let diagnostic = Diagnostic::error(self.kind(), cx.path.clone(), message).with_value(site.value.clone());
        let diagnostic = if cx.options.include_suggestions {
            diagnostic.with_suggestions(["Use an object like {\"type\": \"Text\", \"children\": \"...\"}"])
        } else {
            diagnostic
        };
        vec![diagnostic]
    }
}

fn unknown_type(node: &NodeView<'_>, cx: &StageContext<'_>) -> Diagnostic {
    let type_name = node.node_type();
    let diagnostic = Diagnostic::error(
        StageKind::Schema,
        cx.path.clone(),
        format!("Unknown component type '{type_name}'"),
    )
    .with_value(Value::String(type_name.to_string()));
    if !cx.options.include_suggestions {
        return diagnostic;
    }

    let known = cx.registry.type_names();
    let close = suggest(type_name, known.iter().copied(), cx.options.suggestion_distance, MAX_SUGGESTIONS);
    if !close.is_empty() {
        return diagnostic.with_suggestions(close.iter().map(|name| format!("Did you mean '{name}'?")));
    }
    let mut listed: Vec<&str> = known.into_iter().take(MAX_LISTED_TYPES).collect();
    if listed.is_empty() {
        return diagnostic.with_suggestions(["Register the component type before using it"]);
    }
    listed.sort_unstable();
    diagnostic.with_suggestions([format!(
        "Component '{type_name}' is not registered. Known types include: {}",
        listed.join(", ")
    )])
}

fn check_properties(
    node: &NodeView<'_>,
    descriptor: &ComponentDescriptor,
    cx: &StageContext<'_>,
    out: &mut Vec<Diagnostic>,
) {
    for (key, value) in node.properties() {
        if descriptor.allows(key) || cx.registry.is_common_prop(key) {
            continue;
        }
        let diagnostic = Diagnostic::error(
            StageKind::Schema,
            cx.at(key),
            format!("Unknown property '{key}' for component '{}'", node.node_type()),
        )
        .with_value(value.clone());
        out.push(with_name_suggestions(diagnostic, key, descriptor, cx));
    }
}

fn check_required(
    node: &NodeView<'_>,
    descriptor: &ComponentDescriptor,
    cx: &StageContext<'_>,
    out: &mut Vec<Diagnostic>,
) {
    for prop in &descriptor.required_props {
        let present = if prop == CHILDREN_KEY {
            node.has_children()
        } else {
            node.has_property(prop)
        };
        if present {
            continue;
        }
        let diagnostic = Diagnostic::error(
            StageKind::Schema,
            cx.at(prop.as_str()),
            format!("Required property '{prop}' is missing"),
        );
        out.push(if cx.options.include_suggestions {
            diagnostic.with_suggestions([format!("Add the missing property to your specification: {prop}")])
        } else {
            diagnostic
        });
    }
}

fn check_when(node: &NodeView<'_>, cx: &StageContext<'_>, out: &mut Vec<Diagnostic>) {
    match node.when() {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(other) => out.push(
            Diagnostic::error(StageKind::Schema, cx.at(WHEN_KEY), "`when` must be a string expression")
                .with_value(other.clone()),
        ),
    }
}

fn check_conditional_props(node: &NodeView<'_>, cx: &StageContext<'_>, out: &mut Vec<Diagnostic>) {
    let Some(raw) = node.conditional_props() else { return };
    if raw.is_null() {
        return;
    }
    let base = cx.at(CONDITIONAL_PROPS_KEY);
    let Some(props) = raw.as_object() else {
        out.push(
            Diagnostic::error(
                StageKind::Schema,
                base,
                "conditionalProps must map property names to {expression: value} objects",
            )
            .with_value(raw.clone()),
        );
        return;
    };

    let descriptor = cx.registry.lookup(node.node_type());
    for (prop, entries) in props {
        if !entries.is_object() {
            out.push(
                Diagnostic::error(
                    StageKind::Schema,
                    base.join(prop.as_str()),
                    format!("conditionalProps.{prop} must be an object of expression → value entries"),
                )
                .with_value(entries.clone()),
            );
        }
        let Some(descriptor) = descriptor else { continue };
        if prop == CHILDREN_KEY || descriptor.allows(prop) || cx.registry.is_common_prop(prop) {
            continue;
        }
        let diagnostic = Diagnostic::error(
            StageKind::Schema,
            base.join(prop.as_str()),
            format!("Unknown conditional property '{prop}' for component '{}'", node.node_type()),
        );
        out.push(with_name_suggestions(diagnostic, prop, descriptor, cx));
    }
}

fn with_name_suggestions(
    diagnostic: Diagnostic,
    key: &str,
    descriptor: &ComponentDescriptor,
    cx: &StageContext<'_>,
) -> Diagnostic {
    if !cx.options.include_suggestions {
        return diagnostic;
    }
    let close = suggest(key, descriptor.known_props(), cx.options.suggestion_distance, MAX_SUGGESTIONS);
    diagnostic.with_suggestions(close.iter().map(|name| format!("Did you mean '{name}'?")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use crate::pipeline::ValidationPipeline;
    use crate::registry::StaticRegistry;
    use serde_json::json;

    fn registry() -> StaticRegistry {
        StaticRegistry::new()
            .with_common_props(["id"])
            .with_component("Box", ComponentDescriptor::new().allowed(["padding", "margin"]))
            .with_component("Image", ComponentDescriptor::new().required(["src"]).allowed(["alt"]))
            .with_component("List", ComponentDescriptor::new().required(["children"]))
    }

    fn schema_only(tree: &Value) -> Vec<Diagnostic> {
        ValidationPipeline::new()
            .with_stage(Box::new(SchemaStage))
            .unwrap()
            .run(tree, &registry())
            .diagnostics
    }

    fn paths(ds: &[Diagnostic]) -> Vec<String> {
        ds.iter().map(|d| d.path.to_string()).collect()
    }

    #[test]
    fn unknown_property_with_suggestion() {
        let ds = schema_only(&json!({"type": "Box", "paddin": 4, "id": "main"}));
        assert_eq!(paths(&ds), vec!["paddin"]);
        assert_eq!(ds[0].severity, Severity::Error);
        assert_eq!(ds[0].invalid_value, Some(json!(4)));
        assert_eq!(ds[0].suggestions.as_ref().unwrap()[0], "Did you mean 'padding'?");
    }

    #[test]
    fn missing_required_props() {
        let ds = schema_only(&json!({"type": "Box", "children": [{"type": "Image", "alt": "x"}, {"type": "List"}]}));
        assert_eq!(paths(&ds), vec!["children.0.src", "children.1.children"]);
        assert_eq!(ds[0].message, "Required property 'src' is missing");
        let ok = schema_only(&json!({"type": "List", "children": ["a"]}));
        assert!(ok.is_empty());
    }

    #[test]
    fn unknown_type_lists_known_types_when_nothing_is_close() {
        let ds = schema_only(&json!({"type": "Carousel"}));
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].message, "Unknown component type 'Carousel'");
        let hint = &ds[0].suggestions.as_ref().unwrap()[0];
        assert!(hint.contains("Box, Image, List"), "{hint}");
    }

    #[test]
    fn malformed_dynamic_fields() {
        let ds = schema_only(&json!({
            "type": "Box",
            "when": true,
            "conditionalProps": {"padding": "big", "colour": {"state.x": "red"}}
        }));
        assert_eq!(paths(&ds), vec!["when", "conditionalProps.padding", "conditionalProps.colour"]);
        let ds = schema_only(&json!({"type": "Box", "conditionalProps": []}));
        assert_eq!(paths(&ds), vec!["conditionalProps"]);
    }

    #[test]
    fn invalid_sites_are_errors() {
        let ds = schema_only(&json!({"type": "Box", "children": [7, {"padding": 1}, true]}));
        assert_eq!(paths(&ds), vec!["children.1", "children.2"]);
        assert_eq!(ds[0].message, "Component specification must have a 'type' property");
        assert_eq!(ds[1].message, "Component specification must be an object");
        assert_eq!(ds[1].invalid_value, Some(json!(true)));

        assert!(schema_only(&json!("just text")).is_empty());
    }
}
