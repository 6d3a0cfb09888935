//! Restricted expression language for `when` guards and `conditionalProps`.
//!
//! Expressions read `state.*` (and optionally `props.*`, `env.*`, `data.*`),
//! compare with `===`/`!==`/`<`/`<=`/`>`/`>=`, and combine with `&&`, `||`
//! and `!`. There is no arithmetic, no calls and no assignment, so an
//! expression taken from an untrusted document can only ever read.
//!
//! The convenience entry points fail closed: a malformed expression evaluates
//! to `false` and is logged, it never aborts the caller.
pub mod eval;
pub mod lexer;
pub mod parser;

use serde_json::Value;

pub use eval::{EvalContext, EvalValue};
pub use parser::{BinaryOp, Expr, Reference, Root, Segment};

use crate::error::ExprError;

impl Expr {
    pub fn parse(src: &str) -> Result<Expr, ExprError> {
        parser::parse(src)
    }
}

/// Parse and evaluate in one go, surfacing syntax errors. A blank expression
/// is `true`.
pub fn try_evaluate(expr: &str, ctx: &EvalContext<'_>) -> Result<EvalValue, ExprError> {
    if expr.trim().is_empty() {
        return Ok(EvalValue::from(true));
    }
    Ok(Expr::parse(expr)?.eval(ctx))
}

/// Evaluate against `state`; a malformed expression yields `false`.
pub fn evaluate_expression(expr: &str, state: &Value) -> EvalValue {
    evaluate_in(expr, &EvalContext::new(state))
}

pub fn evaluate_in(expr: &str, ctx: &EvalContext<'_>) -> EvalValue {
    match try_evaluate(expr, ctx) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(%expr, %error, "expression failed to parse; treating as false");
            EvalValue::from(false)
        }
    }
}

/// Truthiness of [`evaluate_expression`].
pub fn evaluate_condition(expr: &str, state: &Value) -> bool {
    evaluate_expression(expr, state).is_truthy()
}

pub fn condition_in(expr: &str, ctx: &EvalContext<'_>) -> bool {
    evaluate_in(expr, ctx).is_truthy()
}

/// Syntax check only. Blank expressions are accepted.
pub fn validate_expression(expr: &str) -> Result<(), ExprError> {
    if expr.trim().is_empty() {
        return Ok(());
    }
    Expr::parse(expr).map(|_| ())
}
