//! Validation and evaluation core for declarative UI specifications.
//!
//! - [`pipeline`]: staged validation producing [`Diagnostic`]s
//! - [`expr`]: the restricted `when` / `conditionalProps` expression language
//! - [`conditional`]: property overrides and the render projection
//! - [`form`]: field rules with sync and async execution
pub mod conditional;
pub mod diagnostic;
pub mod error;
pub mod expr;
pub mod form;
pub mod path_de;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod spec;

pub use conditional::{
    ResolvedChild, ResolvedNode, effective_properties, is_visible, project, resolve_conditional_props,
};
pub use diagnostic::{Counts, Diagnostic, PathSegment, Severity, SpecPath, StageKind};
pub use error::{ExprError, FormError, PipelineError, SpecError};
pub use expr::{
    EvalContext, EvalValue, Expr, evaluate_condition, evaluate_expression, try_evaluate, validate_expression,
};
pub use form::{
    AsyncFieldValidator, FieldResult, FieldRules, FormResult, FormValidator, RuleTable, extract_validation_spec,
};
pub use pipeline::{
    PipelineOptions, PipelineOutput, PreprocessingStage, RelationalStage, SchemaStage, SemanticStage, Stage, StageContext,
    ValidationPipeline, run_validation_pipeline,
};
pub use registry::{ComponentDescriptor, ComponentRegistry, StaticRegistry};
pub use spec::{Children, Node, NodeView};
