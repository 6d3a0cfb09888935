use serde_json::Value;

use super::rules::{FieldRules, RuleTable};
use crate::error::SpecError;
use crate::path_de::from_value_with_path;
use crate::spec::CHILDREN_KEY;

/// Reads a rule table out of a form-shaped specification subtree.
///
/// The form's own `validation` map comes first. Then every descendant node
/// reached through `children` that carries a string `name` and a
/// `validation` object contributes one entry. Later entries replace earlier
/// ones for the same field name.
pub fn extract_validation_spec(form: &Value) -> Result<RuleTable, SpecError> {
    let mut table = RuleTable::new();
    let Some(object) = form.as_object() else {
        return Ok(table);
    };

    if let Some(validation) = object.get("validation").filter(|v| v.is_object()) {
        let top: RuleTable = from_value_with_path(validation).map_err(|e| relocate(e, "validation"))?;
        table.extend(top);
    }

    if let Some(children) = object.get(CHILDREN_KEY) {
        collect_fields(children, CHILDREN_KEY.to_string(), &mut table)?;
    }
    Ok(table)
}

fn collect_fields(children: &Value, location: String, table: &mut RuleTable) -> Result<(), SpecError> {
    match children {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_node(item, format!("{location}[{i}]"), table)?;
            }
            Ok(())
        }
        Value::Object(_) => collect_node(children, location, table),
        _ => Ok(()),
    }
}

fn collect_node(node: &Value, location: String, table: &mut RuleTable) -> Result<(), SpecError> {
    let Some(object) = node.as_object() else {
        return Ok(());
    };
    let name = object.get("name").and_then(Value::as_str);
    let validation = object.get("validation").filter(|v| v.is_object());
    if let (Some(name), Some(validation)) = (name, validation) {
        let rules: FieldRules =
            from_value_with_path(validation).map_err(|e| relocate(e, &format!("{location}.validation")))?;
        table.insert(name.to_string(), rules);
    }
    if let Some(children) = object.get(CHILDREN_KEY) {
        collect_fields(children, format!("{location}.{CHILDREN_KEY}"), table)?;
    }
    Ok(())
}

/// Prefix a parse error's path with where the sub-document came from.
fn relocate(error: SpecError, prefix: &str) -> SpecError {
    match error {
        SpecError::Parse { path, message } => {
            let path = if path.is_empty() || path == "." {
                prefix.to_string()
            } else {
                format!("{prefix}.{path}")
            };
            SpecError::Parse { path, message }
        }
        other => other,
    }
}
