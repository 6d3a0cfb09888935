//! Checks that look at a node together with its ancestors. Not part of the
//! standard pipeline; add it with [`ValidationPipeline::with_stage`].
//!
//! [`ValidationPipeline::with_stage`]: super::ValidationPipeline::with_stage
use super::{Stage, StageContext};
use crate::diagnostic::{Diagnostic, StageKind};
use crate::spec::NodeView;

#[derive(Debug, Clone, Copy, Default)]
pub struct RelationalStage;

impl Stage for RelationalStage {
    fn name(&self) -> &str {
        "relational"
    }

    fn kind(&self) -> StageKind {
        StageKind::Relational
    }

    fn check_node(&self, node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        let max_depth = cx.options.max_nesting_depth;

        // Reported once, at the first level past the limit.
        if cx.depth() == max_depth + 1 {
            let diagnostic = Diagnostic::warning(
                self.kind(),
                cx.path.clone(),
                format!("Component nesting exceeds {max_depth} levels"),
            );
            out.push(if cx.options.include_suggestions {
                diagnostic.with_suggestions(["Consider breaking down complex components into smaller, reusable parts"])
            } else {
                diagnostic
            });
        }

        if node.node_type() == "Heading" && cx.ancestors.contains(&"Heading") {
            out.push(Diagnostic::warning(
                self.kind(),
                cx.path.clone(),
                "Heading is nested inside another Heading",
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineOptions, ValidationPipeline};
    use crate::registry::StaticRegistry;
    use serde_json::{Value, json};

    fn nested(depth: usize) -> Value {
        (0..depth).fold(json!({"type": "Leaf"}), |inner, _| json!({"type": "Box", "children": [inner]}))
    }

    fn relational(max_nesting_depth: usize, tree: &Value) -> Vec<Diagnostic> {
        ValidationPipeline::new()
            .with_options(PipelineOptions { max_nesting_depth, ..PipelineOptions::default() })
            .with_stage(Box::new(RelationalStage))
            .unwrap()
            .run(tree, &StaticRegistry::new())
            .diagnostics
    }

    #[test]
    fn deep_nesting_warns_once() {
        assert!(relational(3, &nested(3)).is_empty());
        let ds = relational(3, &nested(6));
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].message, "Component nesting exceeds 3 levels");
        assert_eq!(ds[0].path.len(), 8);
    }

    #[test]
    fn heading_inside_heading() {
        let tree = json!({"type": "Heading", "children": [{"type": "Text", "children": [{"type": "Heading"}]}]});
        let ds = relational(10, &tree);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds[0].path.to_string(), "children.0.children.0");
    }

    #[test]
    fn standard_pipeline_has_no_relational_findings() {
        let tree = nested(20);
        let out = crate::pipeline::run_validation_pipeline(&tree, &StaticRegistry::new());
        assert!(out.diagnostics.iter().all(|d| d.stage != StageKind::Relational));
    }
}
