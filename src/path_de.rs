use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SpecError;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, SpecError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_spec_error)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SpecError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_spec_error)
}

/// Same as above for an already-parsed document (e.g. a subtree picked out of
/// a larger spec).
pub fn from_value_with_path<T: DeserializeOwned>(value: &Value) -> Result<T, SpecError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(into_spec_error)
}

fn into_spec_error<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> SpecError {
    SpecError::Parse {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn error_carries_json_path() {
        let src = r#"{"a": {"b": [1, "two"]}}"#;
        let err = from_str_with_path::<BTreeMap<String, BTreeMap<String, Vec<u32>>>>(src)
            .unwrap_err();
        match err {
            SpecError::Parse { path, .. } => assert_eq!(path, "a.b[1]"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn value_input_reports_path_too() {
        let value = serde_json::json!({"x": "nope"});
        let err = from_value_with_path::<BTreeMap<String, u8>>(&value).unwrap_err();
        assert!(err.to_string().contains("x"));
    }
}
