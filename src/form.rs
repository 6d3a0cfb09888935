//! Field-level form validation.
//!
//! A [`FormValidator`] owns an immutable rule table. Checks on one field run
//! in a fixed order and stop at the first failure:
//!
//! 1. `required`
//! 2. string checks (`minLength`, `maxLength`, `pattern`, `email`), strings only
//! 3. numeric checks (`min`, `max`), numbers and numeric-looking strings
//!
//! Patterns are compiled once, up front, with the `regex` crate; matching is
//! linear in the input.
pub mod extract;
pub mod rules;

use std::future::Future;
use std::pin::Pin;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FormError;

pub use extract::extract_validation_spec;
pub use rules::{Constraint, FieldRules, Flag, RuleTable};

/// Compiled program size cap for user-supplied patterns.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

const ASYNC_FAILURE_MESSAGE: &str = "Validation failed";

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is a valid literal")
});

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormResult {
    pub is_valid: bool,
    /// Failing fields only, in rule-table order.
    pub errors: IndexMap<String, String>,
}

pub type ValidatorFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Option<String>>> + Send + 'a>>;

/// An external check run after the synchronous rules pass (uniqueness
/// lookups and the like). `Ok(Some(message))` fails the field, `Ok(None)`
/// passes it, and `Err` is reported as a generic failure.
pub trait AsyncFieldValidator: Send + Sync {
    fn validate<'a>(&'a self, value: &'a Value) -> ValidatorFuture<'a>;
}

impl<F, Fut> AsyncFieldValidator for F
where
    F: Fn(&Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<String>>> + Send + 'static,
{
    fn validate<'a>(&'a self, value: &'a Value) -> ValidatorFuture<'a> {
        Box::pin(self(value))
    }
}

#[derive(Debug, Clone)]
pub struct FormValidator {
    rules: RuleTable,
    patterns: IndexMap<String, Regex>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl FieldResult {
    pub fn valid() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

impl FormValidator {
    /// Compiles every `pattern` rule. A pattern that does not compile is a
    /// configuration error, not a validation failure.
    pub fn new(rules: RuleTable) -> Result<Self, FormError> {
        let mut patterns = IndexMap::new();
        for (field, field_rules) in &rules {
            let Some(pattern) = field_rules.pattern.as_ref() else { continue };
            if pattern.value().is_empty() {
                continue;
            }
            let compiled = RegexBuilder::new(pattern.value())
                .size_limit(PATTERN_SIZE_LIMIT)
                .build()
                .map_err(|source| FormError::InvalidPattern {
                    field: field.clone(),
                    source,
                })?;
            patterns.insert(field.clone(), compiled);
        }
        Ok(Self { rules, patterns })
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Fields without rules are always valid. Pass `Value::Null` for a
    /// missing value.
    pub fn validate_field(&self, name: &str, value: &Value) -> FieldResult {
        let Some(rules) = self.rules.get(name) else {
            return FieldResult::valid();
        };
        match self.first_failure(name, rules, value) {
            Some(error) => FieldResult::invalid(error),
            None => FieldResult::valid(),
        }
    }

    /// Every rule-table field is checked; fields in `values` without rules
    /// are ignored.
    pub fn validate_form(&self, values: &Value) -> FormResult {
        let mut errors = IndexMap::new();
        for name in self.rules.keys() {
            let value = values.get(name).unwrap_or(&Value::Null);
            if let Some(error) = self.validate_field(name, value).error {
                errors.insert(name.clone(), error);
            }
        }
        FormResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Synchronous rules first; the external check only runs when they pass.
    pub async fn validate_field_async(
        &self,
        name: &str,
        value: &Value,
        validator: Option<&dyn AsyncFieldValidator>,
    ) -> FieldResult {
        let sync = self.validate_field(name, value);
        if !sync.is_valid {
            return sync;
        }
        let Some(validator) = validator else {
            return sync;
        };
        match validator.validate(value).await {
            Ok(None) => FieldResult::valid(),
            Ok(Some(message)) if message.is_empty() => FieldResult::valid(),
            Ok(Some(message)) => FieldResult::invalid(message),
            Err(error) => {
                tracing::warn!(field = name, error = %error, "async field validator failed");
                FieldResult::invalid(ASYNC_FAILURE_MESSAGE)
            }
        }
    }

    fn first_failure(&self, name: &str, rules: &FieldRules, value: &Value) -> Option<String> {
        if let Some(required) = rules.required.as_ref().filter(|r| r.is_enabled()) {
            if is_empty(value) {
                return Some(
                    required
                        .message()
                        .map_or_else(|| format!("{name} is required"), str::to_string),
                );
            }
        }

        if let Value::String(text) = value {
            if let Some(error) = self.string_failure(name, rules, text) {
                return Some(error);
            }
        }

        if let Some(number) = numeric_value(value) {
            return number_failure(name, rules, number);
        }

        None
    }

    fn string_failure(&self, name: &str, rules: &FieldRules, text: &str) -> Option<String> {
        let length = text.chars().count();

        if let Some(rule) = &rules.min_length {
            let (min, message) = rule.parts();
            if length < *min {
                return Some(message.map_or_else(|| format!("{name} must be at least {min} characters"), str::to_string));
            }
        }

        if let Some(rule) = &rules.max_length {
            let (max, message) = rule.parts();
            if length > *max {
                return Some(
                    message.map_or_else(|| format!("{name} must be no more than {max} characters"), str::to_string),
                );
            }
        }

        if let (Some(rule), Some(regex)) = (&rules.pattern, self.patterns.get(name)) {
            if !regex.is_match(text) {
                return Some(rule.message().map_or_else(|| format!("{name} format is invalid"), str::to_string));
            }
        }

        if let Some(email) = rules.email.as_ref().filter(|e| e.is_enabled()) {
            if !EMAIL.is_match(text) {
                return Some(email.message().unwrap_or("Please enter a valid email address").to_string());
            }
        }

        None
    }
}

fn number_failure(name: &str, rules: &FieldRules, number: f64) -> Option<String> {
    if let Some(rule) = &rules.min {
        let (min, message) = rule.parts();
        if number < *min {
            let min = format_number(*min);
            return Some(message.map_or_else(|| format!("{name} must be at least {min}"), str::to_string));
        }
    }

    if let Some(rule) = &rules.max {
        let (max, message) = rule.parts();
        if number > *max {
            let max = format_number(*max);
            return Some(message.map_or_else(|| format!("{name} must be no more than {max}"), str::to_string));
        }
    }

    None
}

/// `null`, `""` and `[]` count as empty.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(xs) => xs.is_empty(),
        _ => false,
    }
}

/// Numbers, and strings in plain decimal syntax (surrounding whitespace
/// ignored). Blank strings are not numeric.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            let decimal = !trimmed.is_empty()
                && trimmed
                    .bytes()
                    .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
            if decimal { trimmed.parse::<f64>().ok() } else { None }
        }
        _ => None,
    }
}

/// `18.0` prints as `18`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ------------------------------- Tests ------------------------------------ //
