//! Business-rule checks that do not depend on structural shape: value
//! ranges, empty content, deprecations and unparsable expressions.
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::{Stage, StageContext};
use crate::diagnostic::{Diagnostic, StageKind};
use crate::expr::validate_expression;
use crate::spec::{CONDITIONAL_PROPS_KEY, NodeView, WHEN_KEY};

/// A check bound to one component type.
pub type SemanticRule = Arc<dyn Fn(&NodeView<'_>, &StageContext<'_>) -> Vec<Diagnostic> + Send + Sync>;

const FLEX_DIRECTIONS: [&str; 4] = ["row", "column", "row-reverse", "column-reverse"];
const CONTENT_TYPES: [&str; 4] = ["Container", "Card", "Text", "Heading"];

/// Built-in rules keyed by type name, plus the registry-driven deprecation
/// check and expression syntax checks that apply to every node.
#[derive(Clone)]
pub struct SemanticStage {
    rules: HashMap<String, Vec<SemanticRule>>,
}

impl SemanticStage {
    /// The built-in rule table.
    pub fn new() -> Self {
        let stage = Self::empty()
            .with_rule("Grid", grid_columns)
            .with_rule("Grid", grid_children)
            .with_rule("Flex", flex_direction)
            .with_rule("Heading", heading_level)
            .with_rule("Button", button_label);
        CONTENT_TYPES
            .iter()
            .fold(stage, |stage, type_name| stage.with_rule(type_name, empty_content))
    }

    /// No type rules; only the generic checks run.
    pub fn empty() -> Self {
        Self { rules: HashMap::new() }
    }

    /// Add a rule for `type_name`. Rules for one type run in the order added.
    pub fn with_rule<F>(mut self, type_name: &str, rule: F) -> Self
    where
        F: Fn(&NodeView<'_>, &StageContext<'_>) -> Vec<Diagnostic> + Send + Sync + 'static,
    {
        self.rules
            .entry(type_name.to_string())
            .or_default()
            .push(Arc::new(rule));
        self
    }
}

impl Default for SemanticStage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for SemanticStage {
    fn name(&self) -> &str {
        "semantic"
    }

    fn kind(&self) -> StageKind {
        StageKind::Semantic
    }

    fn check_node(&self, node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        if let Some(rules) = self.rules.get(node.node_type()) {
            for rule in rules {
                out.extend(rule(node, cx));
            }
        }
        deprecated_props(node, cx, &mut out);
        expressions(node, cx, &mut out);
        out
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT-IN RULES
// ————————————————————————————————————————————————————————————————————————————

fn hint(cx: &StageContext<'_>, diagnostic: Diagnostic, suggestion: impl Into<String>) -> Diagnostic {
    if cx.options.include_suggestions {
        diagnostic.with_suggestions([suggestion.into()])
    } else {
        diagnostic
    }
}

fn grid_columns(node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
    fn in_range(value: &Value) -> bool {
        match value {
            Value::Number(n) => n.as_u64().is_some_and(|c| (1..=12).contains(&c)),
            Value::String(s) => s.trim().parse::<u64>().is_ok_and(|c| (1..=12).contains(&c)),
            // responsive form: { "sm": 1, "md": 2, ... }
            Value::Object(breakpoints) => !breakpoints.is_empty() && breakpoints.values().all(in_range),
            _ => false,
        }
    }
    let Some(columns) = node.property("columns") else { return Vec::new() };
    if columns.is_null() || in_range(columns) {
        return Vec::new();
    }
    let diagnostic = Diagnostic::error(StageKind::Semantic, cx.at("columns"), "Grid columns must be between 1 and 12")
        .with_value(columns.clone());
    vec![hint(cx, diagnostic, "Use a value between 1 and 12 for columns")]
}

fn grid_children(node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
    if node.has_children() {
        return Vec::new();
    }
    let diagnostic = Diagnostic::warning(StageKind::Semantic, cx.path.clone(), "Grid has no children");
    vec![hint(cx, diagnostic, "Add child components or remove the empty Grid")]
}

fn flex_direction(node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
    let Some(direction) = node.property("direction") else { return Vec::new() };
    if direction.is_null() || direction.as_str().is_some_and(|d| FLEX_DIRECTIONS.contains(&d)) {
        return Vec::new();
    }
    let diagnostic = Diagnostic::error(
        StageKind::Semantic,
        cx.at("direction"),
        format!("Flex direction must be one of: {}", FLEX_DIRECTIONS.join(", ")),
    )
    .with_value(direction.clone());
    vec![hint(cx, diagnostic, "Use \"row\" or \"column\"")]
}

fn heading_level(node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
    let Some(level) = node.property("level") else { return Vec::new() };
    let valid = match level {
        Value::Null => true,
        Value::Number(n) => n.as_u64().is_some_and(|l| (1..=6).contains(&l)),
        Value::String(s) => matches!(s.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6"),
        _ => false,
    };
    if valid {
        return Vec::new();
    }
    let diagnostic = Diagnostic::error(
        StageKind::Semantic,
        cx.at("level"),
        "Heading level must be between 1 and 6 (or \"h1\" to \"h6\")",
    )
    .with_value(level.clone());
    vec![hint(cx, diagnostic, "Use a level from 1 to 6")]
}

fn empty_content(node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
    let inline_text = matches!(node.node_type(), "Text" | "Heading")
        && (node.has_property("text") || node.has_property("content"));
    if node.has_children() || inline_text {
        return Vec::new();
    }
    let diagnostic = Diagnostic::warning(
        StageKind::Semantic,
        cx.path.clone(),
        format!("{} has no children", node.node_type()),
    );
    vec![hint(cx, diagnostic, "Add content or remove the empty component")]
}

fn button_label(node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
    let aria_label = node
        .property("a11y")
        .and_then(|a11y| a11y.get("ariaLabel"))
        .is_some_and(|label| label.as_str().is_some_and(|s| !s.trim().is_empty()));
    if node.has_children() || aria_label {
        return Vec::new();
    }
    let diagnostic = Diagnostic::warning(
        StageKind::Semantic,
        cx.path.clone(),
        "Button has no text content and no accessible label",
    );
    vec![hint(cx, diagnostic, "Add children text or set a11y.ariaLabel")]
}

// ————————————————————————————————————————————————————————————————————————————
// GENERIC CHECKS
// ————————————————————————————————————————————————————————————————————————————

fn deprecated_props(node: &NodeView<'_>, cx: &StageContext<'_>, out: &mut Vec<Diagnostic>) {
    let Some(descriptor) = cx.registry.lookup(node.node_type()) else { return };
    for (old, replacement) in &descriptor.deprecated_props {
        let Some(value) = node.property(old) else { continue };
        let diagnostic = Diagnostic::warning(
            StageKind::Semantic,
            cx.at(old.as_str()),
            format!("Property '{old}' is deprecated"),
        )
        .with_value(value.clone());
        out.push(hint(cx, diagnostic, format!("Use `{replacement}` instead")));
    }
}

fn expressions(node: &NodeView<'_>, cx: &StageContext<'_>, out: &mut Vec<Diagnostic>) {
    if let Some(Value::String(when)) = node.when() {
        if let Err(error) = validate_expression(when) {
            out.push(
                Diagnostic::warning(StageKind::Semantic, cx.at(WHEN_KEY), format!("Invalid `when` expression: {error}"))
                    .with_value(Value::String(when.clone())),
            );
        }
    }
    let Some(Value::Object(props)) = node.conditional_props() else { return };
    let base = cx.at(CONDITIONAL_PROPS_KEY);
    for (prop, entries) in props {
        let Some(entries) = entries.as_object() else { continue };
        for expr in entries.keys() {
            if let Err(error) = validate_expression(expr) {
                out.push(
                    Diagnostic::warning(
                        StageKind::Semantic,
                        base.join(prop.as_str()).join(expr.as_str()),
                        format!("Invalid conditional expression: {error}"),
                    )
                    .with_value(Value::String(expr.clone())),
                );
            }
        }
    }
}
