//! Document-level checks that run before any node is looked at: the root (or
//! the page envelope's `root`) has to be a component object.
use serde_json::Value;

use super::walk::{InvalidKind, InvalidSite};
use super::{Stage, StageContext};
use crate::diagnostic::{Diagnostic, StageKind};
use crate::spec::NodeView;

#[derive(Debug, Clone, Copy, Default)]
pub struct PreprocessingStage;

impl Stage for PreprocessingStage {
    fn name(&self) -> &str {
        "preprocessing"
    }

    fn kind(&self) -> StageKind {
        StageKind::Preprocessing
    }

    fn check_node(&self, _node: &NodeView<'_>, _cx: &StageContext<'_>) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn check_invalid(&self, site: &InvalidSite<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
        if site.kind != InvalidKind::Root {
            return Vec::new();
        }
        let (message, hint) = match site.value {
            Value::Null => ("Specification is empty", "Provide a component object as the specification root"),
            Value::Object(_) => (
                "Component specification must have a 'type' property",
                "Add a \"type\" naming a registered component",
            ),
            _ => (
                "Specification root must be a component object",
                "Use an object like {\"type\": \"Container\", \"children\": [...]}",
            ),
        };
        let diagnostic = Diagnostic::error(self.kind(), cx.path.clone(), message).with_value(site.value.clone());
        vec![if cx.options.include_suggestions {
            diagnostic.with_suggestions([hint])
        } else {
            diagnostic
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ValidationPipeline, run_validation_pipeline};
    use crate::registry::{ComponentDescriptor, StaticRegistry};
    use serde_json::json;

    fn registry() -> StaticRegistry {
        StaticRegistry::new().with_component("Box", ComponentDescriptor::new())
    }

    #[test]
    fn non_node_roots() {
        let reg = registry();
        for (tree, message) in [
            (json!(null), "Specification is empty"),
            (json!("just text"), "Specification root must be a component object"),
            (json!([{"type": "Box"}]), "Specification root must be a component object"),
            (json!({"children": []}), "Component specification must have a 'type' property"),
        ] {
            let out = run_validation_pipeline(&tree, &reg);
            assert_eq!(out.diagnostics.len(), 1, "{tree}");
            assert_eq!(out.diagnostics[0].stage, StageKind::Preprocessing);
            assert_eq!(out.diagnostics[0].message, message);
            assert!(out.diagnostics[0].path.is_root());
            assert!(out.has_errors());
        }
    }

    #[test]
    fn envelope_root_is_checked() {
        let doc = json!({"version": "1", "root": 3});
        let out = run_validation_pipeline(&doc, &registry());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].path.to_string(), "root");
        assert_eq!(out.diagnostics[0].invalid_value, Some(json!(3)));
    }

    #[test]
    fn silent_on_valid_trees_and_inner_sites() {
        let pipeline = ValidationPipeline::new().with_stage(Box::new(PreprocessingStage)).unwrap();
        let doc = json!({"type": "Box", "children": [true, {"x": 1}]});
        let out = pipeline.run(&doc, &registry());
        assert!(out.diagnostics.is_empty());
    }
}
