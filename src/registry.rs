//! Component registry: the type-name → descriptor lookup the schema stage
//! consults.
//!
//! The pipeline only sees the [`ComponentRegistry`] trait. [`StaticRegistry`]
//! is the concrete table shipped with the crate; it loads from JSON:
//!
//! ```json
//! { "commonProps": ["className", "id"],
//!   "components": {
//!     "Image": { "requiredProps": ["src"], "allowedProps": ["alt"] },
//!     "Button": { "allowedProps": ["variant"], "deprecatedProps": { "type": "variant" } } } }
//! ```
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::SpecError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub trait ComponentRegistry: Send + Sync {
    fn lookup(&self, type_name: &str) -> Option<&ComponentDescriptor>;

    /// All registered type names, in registration order.
    fn type_names(&self) -> Vec<&str>;

    /// Properties every component accepts (ids, class names, ...).
    fn is_common_prop(&self, _prop: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentDescriptor {
    pub required_props: Vec<String>,
    pub allowed_props: IndexSet<String>,
    /// Old property name → replacement.
    pub deprecated_props: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticRegistry {
    common_props: IndexSet<String>,
    components: IndexMap<String, ComponentDescriptor>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ComponentDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_props.extend(props.into_iter().map(Into::into));
        self
    }

    pub fn allowed<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_props.extend(props.into_iter().map(Into::into));
        self
    }

    pub fn deprecated(mut self, old: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.deprecated_props.insert(old.into(), replacement.into());
        self
    }

    /// Required and deprecated props are implicitly allowed.
    pub fn allows(&self, prop: &str) -> bool {
        self.allowed_props.contains(prop)
            || self.required_props.iter().any(|p| p == prop)
            || self.deprecated_props.contains_key(prop)
    }

    /// Every name [`allows`](Self::allows) accepts, for suggestions.
    pub fn known_props(&self) -> impl Iterator<Item = &str> {
        self.required_props
            .iter()
            .map(String::as_str)
            .chain(self.allowed_props.iter().map(String::as_str))
            .chain(self.deprecated_props.keys().map(String::as_str))
    }
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(src: &str) -> Result<Self, SpecError> {
        crate::path_de::from_str_with_path(src)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let bytes = std::fs::read(path)?;
        crate::path_de::from_slice_with_path(&bytes)
    }

    pub fn with_component(mut self, name: impl Into<String>, descriptor: ComponentDescriptor) -> Self {
        self.components.insert(name.into(), descriptor);
        self
    }

    pub fn with_common_props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.common_props.extend(props.into_iter().map(Into::into));
        self
    }

    pub fn common_props(&self) -> impl Iterator<Item = &str> {
        self.common_props.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl ComponentRegistry for StaticRegistry {
    fn lookup(&self, type_name: &str) -> Option<&ComponentDescriptor> {
        self.components.get(type_name)
    }

    fn type_names(&self) -> Vec<&str> {
        self.components.keys().map(String::as_str).collect()
    }

    fn is_common_prop(&self, prop: &str) -> bool {
        self.common_props.contains(prop)
    }
}

/// Nearest names to `target` among `candidates`: case-insensitive Levenshtein
/// distance no greater than `max_distance`, closest first, at most `limit`.
/// Ties keep candidate order.
pub fn suggest<'a, I>(target: &str, candidates: I, max_distance: usize, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = target.to_lowercase();
    let mut scored: Vec<(usize, &str)> = Vec::new();
    for candidate in candidates {
        if scored.iter().any(|(_, seen)| *seen == candidate) {
            continue;
        }
        let distance = strsim::levenshtein(&needle, &candidate.to_lowercase());
        if distance <= max_distance {
            scored.push((distance, candidate));
        }
    }
    scored.sort_by_key(|(distance, _)| *distance);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StaticRegistry {
        StaticRegistry::from_str(
            r#"{
                "commonProps": ["id", "className"],
                "components": {
                    "Button": {"allowedProps": ["variant"], "deprecatedProps": {"kind": "variant"}},
                    "Image": {"requiredProps": ["src"], "allowedProps": ["alt"]},
                    "Box": {}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn loads_descriptors_from_json() {
        let reg = registry();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.type_names(), vec!["Button", "Image", "Box"]);
        let image = reg.lookup("Image").unwrap();
        assert_eq!(image.required_props, vec!["src".to_string()]);
        assert!(image.allows("src"));
        assert!(image.allows("alt"));
        assert!(!image.allows("href"));
        assert!(reg.lookup("Unknown").is_none());
    }

    #[test]
    fn deprecated_and_common_props() {
        let reg = registry();
        assert!(reg.lookup("Button").unwrap().allows("kind"));
        assert!(reg.is_common_prop("className"));
        assert!(!reg.is_common_prop("variant"));
    }

    #[test]
    fn malformed_registry_reports_path() {
        let err = StaticRegistry::from_str(r#"{"components": {"Box": {"requiredProps": "src"}}}"#)
            .unwrap_err();
        match err {
            SpecError::Parse { path, .. } => assert_eq!(path, "components.Box.requiredProps"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn builder_matches_json_form() {
        let reg = StaticRegistry::new()
            .with_common_props(["id"])
            .with_component("Image", ComponentDescriptor::new().required(["src"]).allowed(["alt"]));
        assert!(reg.lookup("Image").unwrap().allows("alt"));
        assert!(reg.is_common_prop("id"));
    }

    #[test]
    fn suggestions_are_case_insensitive_and_ranked() {
        let names = ["Button", "Badge", "Box", "Card"];
        assert_eq!(suggest("buton", names, 3, 3)[0], "Button");
        assert_eq!(suggest("BOX", names, 3, 3)[0], "Box");
        assert!(suggest("Carousel", names, 2, 3).is_empty());
        assert!(suggest("Bx", names, 3, 3).len() <= 3);
    }
}
