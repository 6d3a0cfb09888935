//! Multi-stage validation.
//!
//! A [`ValidationPipeline`] is an ordered list of [`Stage`]s. Each stage sees
//! every node of the tree (see [`walk`]) and returns diagnostics; the pipeline
//! concatenates them in stage order, then traversal order. Findings are never
//! errors and the tree is handed back untouched; only a malformed stage
//! registration fails, with [`PipelineError`].
pub mod preprocessing;
pub mod relational;
pub mod schema;
pub mod semantic;
pub mod walk;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostic::{Counts, Diagnostic, Severity, SpecPath, StageKind};
use crate::error::PipelineError;
use crate::registry::ComponentRegistry;
use crate::spec::{NodeView, unwrap_page};

pub use preprocessing::PreprocessingStage;
pub use relational::RelationalStage;
pub use schema::SchemaStage;
pub use semantic::SemanticStage;
pub use walk::{InvalidKind, InvalidSite};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineOptions {
    /// Attach "Did you mean" and remediation hints.
    pub include_suggestions: bool,
    /// Largest edit distance a name suggestion may have.
    pub suggestion_distance: usize,
    /// Relational stage: nesting deeper than this warns.
    pub max_nesting_depth: usize,
}

/// What a stage knows about the node it is looking at.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    pub path: &'a SpecPath,
    pub registry: &'a dyn ComponentRegistry,
    /// Type names of the enclosing nodes, outermost first.
    pub ancestors: &'a [&'a str],
    pub options: &'a PipelineOptions,
}

pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> StageKind;

    fn check_node(&self, node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic>;

    /// Called where a node was expected but the value is something else.
    fn check_invalid(&self, _site: &InvalidSite<'_>, _cx: &StageContext<'_>) -> Vec<Diagnostic> {
        Vec::new()
    }
}

pub struct ValidationPipeline {
    stages: Vec<Box<dyn Stage>>,
    options: PipelineOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput<'t> {
    pub tree: &'t Value,
    pub diagnostics: Vec<Diagnostic>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            include_suggestions: true,
            suggestion_distance: 3,
            max_nesting_depth: 10,
        }
    }
}

impl StageContext<'_> {
    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    pub fn parent_type(&self) -> Option<&str> {
        self.ancestors.last().copied()
    }

    pub fn at(&self, segment: impl Into<crate::diagnostic::PathSegment>) -> SpecPath {
        self.path.join(segment)
    }
}

impl ValidationPipeline {
    /// A pipeline with no stages.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            options: PipelineOptions::default(),
        }
    }

    /// Preprocessing, then Schema, then Semantic.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Box::new(PreprocessingStage),
                Box::new(SchemaStage),
                Box::new(SemanticStage::new()),
            ],
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn add_stage(&mut self, stage: Box<dyn Stage>) -> Result<(), PipelineError> {
        let name = stage.name().trim();
        if name.is_empty() {
            return Err(PipelineError::EmptyStageName);
        }
        if self.stages.iter().any(|s| s.name() == name) {
            return Err(PipelineError::DuplicateStage(name.to_string()));
        }
        self.stages.push(stage);
        Ok(())
    }

    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Result<Self, PipelineError> {
        self.add_stage(stage)?;
        Ok(self)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run<'t>(&self, tree: &'t Value, registry: &dyn ComponentRegistry) -> PipelineOutput<'t> {
        let (root, wrapped) = unwrap_page(tree);
        let root_path = if wrapped { SpecPath::root().join("root") } else { SpecPath::root() };

        let mut diagnostics = Vec::new();
        for stage in &self.stages {
            let before = diagnostics.len();
            walk::walk(root, root_path.clone(), &mut |visit, path, ancestors| {
                let cx = StageContext {
                    path,
                    registry,
                    ancestors,
                    options: &self.options,
                };
                let found = match visit {
                    walk::Visit::Node(node) => stage.check_node(&node, &cx),
                    walk::Visit::Invalid(site) => stage.check_invalid(&site, &cx),
                };
                diagnostics.extend(found);
            });
            tracing::trace!(stage = stage.name(), found = diagnostics.len() - before, "stage finished");
        }

        let counts = Counts::of(&diagnostics);
        tracing::debug!(
            stages = self.stages.len(),
            errors = counts.errors,
            warnings = counts.warnings,
            infos = counts.infos,
            "validation pipeline finished"
        );
        PipelineOutput { tree, diagnostics }
    }
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl PipelineOutput<'_> {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Warning)
    }

    pub fn counts(&self) -> Counts {
        Counts::of(&self.diagnostics)
    }

    pub fn for_stage(&self, stage: StageKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.stage == stage)
    }
}

/// Runs the standard Preprocessing → Schema → Semantic pipeline.
pub fn run_validation_pipeline<'t>(tree: &'t Value, registry: &dyn ComponentRegistry) -> PipelineOutput<'t> {
    ValidationPipeline::standard().run(tree, registry)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::PathSegment;
    use crate::registry::{ComponentDescriptor, StaticRegistry};
    use serde_json::json;

    fn registry() -> StaticRegistry {
        StaticRegistry::new()
            .with_common_props(["id", "className"])
            .with_component("Container", ComponentDescriptor::new().allowed(["padding"]))
            .with_component("Grid", ComponentDescriptor::new().allowed(["columns", "gap"]))
            .with_component("Text", ComponentDescriptor::new().allowed(["size"]))
            .with_component("Image", ComponentDescriptor::new().required(["src"]).allowed(["alt"]))
            .with_component(
                "Button",
                ComponentDescriptor::new().allowed(["variant", "a11y"]).deprecated("kind", "variant"),
            )
    }

    fn path(segments: &[PathSegment]) -> SpecPath {
        segments.iter().cloned().collect()
    }

    struct NamedStage(&'static str);

    impl Stage for NamedStage {
        fn name(&self) -> &str {
            self.0
        }
        fn kind(&self) -> StageKind {
            StageKind::Custom
        }
        fn check_node(&self, node: &NodeView<'_>, cx: &StageContext<'_>) -> Vec<Diagnostic> {
            vec![Diagnostic::info(self.kind(), cx.path.clone(), format!("saw {}", node.node_type()))]
        }
    }

    #[test]
    fn unknown_type_yields_exactly_one_error_at_node_path() {
        let tree = json!({"type": "Container", "children": [{"type": "Buton", "variant": "x"}]});
        let out = run_validation_pipeline(&tree, &registry());
        let node_path = path(&["children".into(), 0.into()]);
        let at_node: Vec<_> = out.diagnostics.iter().filter(|d| d.path == node_path).collect();
        assert_eq!(at_node.len(), 1);
        assert!(at_node[0].is_error());
        assert_eq!(at_node[0].stage, StageKind::Schema);
        let suggestions = at_node[0].suggestions.as_ref().unwrap();
        assert!(suggestions[0].contains("Button"));
    }

    #[test]
    fn stages_report_in_declaration_order_and_never_suppress() {
        let tree = json!({
            "type": "Grid",
            "columns": 13,
            "bogus": true,
            "children": [{"type": "Text", "children": "hi"}]
        });
        let out = run_validation_pipeline(&tree, &registry());
        let stages: Vec<_> = out.diagnostics.iter().map(|d| d.stage).collect();
        assert_eq!(stages, vec![StageKind::Schema, StageKind::Semantic]);
        assert_eq!(out.diagnostics[0].path, path(&["bogus".into()]));
        assert_eq!(out.diagnostics[1].path, path(&["columns".into()]));
        assert!(out.has_errors());
        assert_eq!(out.counts().errors, 2);
    }

    #[test]
    fn deeply_nested_when_is_a_warning() {
        let when = "(".repeat(5000) + "state.a" + &")".repeat(5000);
        let tree = json!({"type": "Container", "when": when, "children": "x"});
        let out = run_validation_pipeline(&tree, &registry());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].severity, Severity::Warning);
        assert_eq!(out.diagnostics[0].stage, StageKind::Semantic);
        assert_eq!(out.diagnostics[0].path, path(&["when".into()]));
        assert!(out.diagnostics[0].message.contains("nests more than"));
    }

    #[test]
    fn tree_is_returned_unchanged() {
        let tree = json!({"type": "Nope", "children": [1, {"x": 1}]});
        let snapshot = tree.clone();
        let out = run_validation_pipeline(&tree, &registry());
        assert_eq!(out.tree, &snapshot);
        assert!(std::ptr::eq(out.tree, &tree));
    }

    #[test]
    fn idempotent() {
        let tree = json!({
            "type": "Container",
            "children": [{"type": "Image"}, {"type": "Grid", "columns": 0}, {"type": "Button", "kind": "a"}]
        });
        let reg = registry();
        let a = serde_json::to_string(&run_validation_pipeline(&tree, &reg).diagnostics).unwrap();
        let b = serde_json::to_string(&run_validation_pipeline(&tree, &reg).diagnostics).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn page_envelope_paths_are_prefixed() {
        let page = json!({"version": "1", "root": {"type": "Image"}});
        let out = run_validation_pipeline(&page, &registry());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].path, path(&["root".into(), "src".into()]));
    }

    #[test]
    fn custom_stage_registration() {
        let mut pipeline = ValidationPipeline::new();
        pipeline.add_stage(Box::new(NamedStage("audit"))).unwrap();
        assert!(matches!(
            pipeline.add_stage(Box::new(NamedStage("audit"))),
            Err(PipelineError::DuplicateStage(name)) if name == "audit"
        ));
        assert!(matches!(
            pipeline.add_stage(Box::new(NamedStage("  "))),
            Err(PipelineError::EmptyStageName)
        ));
        let tree = json!({"type": "A", "children": [{"type": "B"}]});
        let out = pipeline.run(&tree, &registry());
        let messages: Vec<_> = out.diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["saw A", "saw B"]);
        assert!(!out.has_errors());
    }

    #[test]
    fn standard_stage_names() {
        let pipeline = ValidationPipeline::standard();
        assert_eq!(pipeline.stage_names(), vec!["preprocessing", "schema", "semantic"]);
        let with_relational = pipeline.with_stage(Box::new(RelationalStage)).unwrap();
        assert_eq!(
            with_relational.stage_names(),
            vec!["preprocessing", "schema", "semantic", "relational"]
        );
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: PipelineOptions = serde_json::from_value(json!({"maxNestingDepth": 4})).unwrap();
        assert_eq!(options.max_nesting_depth, 4);
        assert!(options.include_suggestions);
        assert_eq!(options.suggestion_distance, 3);
    }

    #[test]
    fn suggestions_can_be_disabled() {
        let tree = json!({"type": "Buton"});
        let pipeline = ValidationPipeline::standard().with_options(PipelineOptions {
            include_suggestions: false,
            ..PipelineOptions::default()
        });
        let out = pipeline.run(&tree, &registry());
        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.diagnostics[0].suggestions.is_none());
    }
}
