//! The per-field rule table.
//!
//! Wire form, as it appears in a form specification's `validation` map:
//!
//! ```json
//! { "username": { "required": true, "minLength": { "value": 3, "message": "Too short" } },
//!   "email":    { "required": "Email is required", "email": true },
//!   "age":      { "min": 18, "max": 120 } }
//! ```
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Field name → rules, in declaration order.
pub type RuleTable = IndexMap<String, FieldRules>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<Constraint<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<Constraint<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Constraint<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Constraint<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Constraint<f64>>,
}

/// `true | false | "custom message"`. A non-empty message turns the rule on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Enabled(bool),
    Message(String),
}

/// A bare constraint value, or `{ "value": .., "message": .. }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constraint<T> {
    WithMessage {
        value: T,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Simple(T),
}

impl Flag {
    pub fn is_enabled(&self) -> bool {
        match self {
            Flag::Enabled(on) => *on,
            Flag::Message(message) => !message.is_empty(),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Flag::Message(message) if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

impl<T> Constraint<T> {
    pub fn value(&self) -> &T {
        match self {
            Constraint::WithMessage { value, .. } | Constraint::Simple(value) => value,
        }
    }

    /// The custom message, when one is set and non-empty.
    pub fn message(&self) -> Option<&str> {
        match self {
            Constraint::WithMessage { message: Some(m), .. } if !m.is_empty() => Some(m),
            _ => None,
        }
    }

    pub fn parts(&self) -> (&T, Option<&str>) {
        (self.value(), self.message())
    }
}

impl<T> From<T> for Constraint<T> {
    fn from(value: T) -> Self {
        Constraint::Simple(value)
    }
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = Some(Flag::Enabled(true));
        self
    }

    pub fn required_with(mut self, message: impl Into<String>) -> Self {
        self.required = Some(Flag::Message(message.into()));
        self
    }

    pub fn email(mut self) -> Self {
        self.email = Some(Flag::Enabled(true));
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n.into());
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(Constraint::Simple(pattern.into()));
        self
    }

    pub fn min(mut self, n: f64) -> Self {
        self.min = Some(n.into());
        self
    }

    pub fn max(mut self, n: f64) -> Self {
        self.max = Some(n.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_both_constraint_shapes() {
        let table: RuleTable = serde_json::from_value(json!({
            "username": {"required": true, "minLength": {"value": 3, "message": "Too short"}, "maxLength": 20},
            "email": {"required": "Email is required", "email": true},
            "age": {"min": 18, "max": {"value": 120.5}}
        }))
        .unwrap();
        let keys: Vec<_> = table.keys().cloned().collect();
        assert_eq!(keys, vec!["username", "email", "age"]);

        let username = &table["username"];
        assert_eq!(username.min_length.as_ref().unwrap().parts(), (&3, Some("Too short")));
        assert_eq!(username.max_length.as_ref().unwrap().parts(), (&20, None));
        assert_eq!(table["email"].required.as_ref().unwrap().message(), Some("Email is required"));
        assert_eq!(*table["age"].max.as_ref().unwrap().value(), 120.5);
    }

    #[test]
    fn flags() {
        assert!(Flag::Enabled(true).is_enabled());
        assert!(!Flag::Enabled(false).is_enabled());
        assert!(!Flag::Message(String::new()).is_enabled());
        assert_eq!(Flag::Enabled(true).message(), None);
    }

    #[test]
    fn empty_custom_message_falls_back() {
        let c: Constraint<usize> = serde_json::from_value(json!({"value": 2, "message": ""})).unwrap();
        assert_eq!(c.message(), None);
    }

    #[test]
    fn rejects_wrong_shapes() {
        let bad = serde_json::from_value::<FieldRules>(json!({"minLength": "three"}));
        assert!(bad.is_err());
    }
}
