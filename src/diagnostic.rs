//! The finding shape shared by every part of the crate.
//!
//! A [`Diagnostic`] is built once by whichever stage found the problem and is
//! never touched again; builder methods consume `self`. The serialized form is
//! the wire shape hosts and presentation layers consume:
//!
//! ```json
//! { "severity": "error", "message": "...", "path": ["children", 0],
//!   "stage": "schema", "invalidValue": 42, "suggestions": ["..."] }
//! ```
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Which validation stage produced a diagnostic. Declaration order is the
/// order reports group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Preprocessing,
    Schema,
    Semantic,
    Relational,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Location of a value inside a specification tree, root first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecPath(Vec<PathSegment>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub path: SpecPath,
    pub stage: StageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Per-severity tally of a diagnostic list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Info => "Info",
        }
    }
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        StageKind::Preprocessing,
        StageKind::Schema,
        StageKind::Semantic,
        StageKind::Relational,
        StageKind::Custom,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StageKind::Preprocessing => "Preprocessing",
            StageKind::Schema => "Schema",
            StageKind::Semantic => "Semantic",
            StageKind::Relational => "Relational",
            StageKind::Custom => "Custom",
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{i}"),
            PathSegment::Key(k) => f.write_str(k),
        }
    }
}

impl SpecPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// A new path one segment deeper; `self` is left untouched.
    pub fn join(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for SpecPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for SpecPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Diagnostic {
    pub fn new(severity: Severity, stage: StageKind, path: SpecPath, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            path,
            stage,
            invalid_value: None,
            suggestions: None,
        }
    }

    pub fn error(stage: StageKind, path: SpecPath, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, stage, path, message)
    }

    pub fn warning(stage: StageKind, path: SpecPath, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, stage, path, message)
    }

    pub fn info(stage: StageKind, path: SpecPath, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, stage, path, message)
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.invalid_value = Some(value);
        self
    }

    /// Attach remediation hints. An empty list leaves the field unset so the
    /// wire shape omits it.
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let suggestions: Vec<String> = suggestions.into_iter().map(Into::into).collect();
        self.suggestions = if suggestions.is_empty() { None } else { Some(suggestions) };
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}: {}",
            self.stage.label().to_lowercase(),
            self.severity.label(),
            self.path,
            self.message
        )
    }
}

impl Counts {
    pub fn of(diagnostics: &[Diagnostic]) -> Self {
        diagnostics.iter().fold(Self::default(), |mut acc, d| {
            match d.severity {
                Severity::Error => acc.errors += 1,
                Severity::Warning => acc.warnings += 1,
                Severity::Info => acc.infos += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.infos
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_shape_omits_absent_optionals() {
        let path: SpecPath = [PathSegment::from("children"), PathSegment::from(0)].into_iter().collect();
        let d = Diagnostic::error(StageKind::Schema, path, "boom");
        let wire = serde_json::to_value(&d).unwrap();
        assert_eq!(
            wire,
            json!({"severity": "error", "message": "boom", "path": ["children", 0], "stage": "schema"})
        );
    }

    #[test]
    fn wire_shape_includes_value_and_suggestions() {
        let d = Diagnostic::warning(StageKind::Semantic, SpecPath::root().join("columns"), "bad")
            .with_value(json!(13))
            .with_suggestions(["Use a value between 1 and 12 for columns"]);
        let wire = serde_json::to_value(&d).unwrap();
        assert_eq!(wire["invalidValue"], json!(13));
        assert_eq!(wire["suggestions"][0], "Use a value between 1 and 12 for columns");
        assert_eq!(wire["stage"], "semantic");
        assert_eq!(wire["severity"], "warning");
    }

    #[test]
    fn empty_suggestions_stay_unset() {
        let d = Diagnostic::info(StageKind::Custom, SpecPath::root(), "fyi")
            .with_suggestions(Vec::<String>::new());
        assert!(d.suggestions.is_none());
    }

    #[test]
    fn path_display_and_join() {
        let base = SpecPath::root().join("children").join(2);
        let deeper = base.join("variant");
        assert_eq!(base.to_string(), "children.2");
        assert_eq!(deeper.to_string(), "children.2.variant");
        assert_eq!(SpecPath::root().to_string(), "(root)");
    }

    #[test]
    fn round_trips_through_json() {
        let d = Diagnostic::error(StageKind::Schema, SpecPath::root().join("a").join(1), "x");
        let back: Diagnostic = serde_json::from_value(serde_json::to_value(&d).unwrap()).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn counts_by_severity() {
        let ds = vec![
            Diagnostic::error(StageKind::Schema, SpecPath::root(), "a"),
            Diagnostic::warning(StageKind::Semantic, SpecPath::root(), "b"),
            Diagnostic::warning(StageKind::Semantic, SpecPath::root(), "c"),
        ];
        let c = Counts::of(&ds);
        assert_eq!((c.errors, c.warnings, c.infos), (1, 2, 0));
        assert_eq!(c.total(), 3);
    }
}
