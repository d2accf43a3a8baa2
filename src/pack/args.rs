//! Keyword-argument validation against a pack's declared run arguments.

use serde_json::{Map, Value, json};

use crate::package::{ArgSchema, ArgSpec};

/// Check `args` against `schema`.
///
/// On failure returns the message handed back to the caller in place of a
/// result, e.g. `Error: Invalid arguments. Details: query: field required`.
/// Arguments the schema does not mention are ignored.
pub fn validate_args(schema: &ArgSchema, args: &Map<String, Value>) -> Result<(), String> {
    let problems: Vec<String> = schema
        .iter()
        .filter_map(|(name, spec)| check_arg(spec, args.get(name)).map(|msg| format!("{}: {}", name, msg)))
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "Error: Invalid arguments. Details: {}",
            problems.join(". ")
        ))
    }
}

fn check_arg(spec: &ArgSpec, value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) if spec.required => Some("field required".to_string()),
        None | Some(Value::Null) => None,
        Some(value) => {
            let expected = ArgType::parse(&spec.arg_type)?;
            (!expected.accepts(value)).then(|| format!("value is not a valid {}", expected.label()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ArgType {
    /// Unknown type names, including `any`, are not checked.
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "string" | "str" => Some(ArgType::String),
            "integer" | "int" => Some(ArgType::Integer),
            "number" | "float" => Some(ArgType::Number),
            "boolean" | "bool" => Some(ArgType::Boolean),
            "array" | "list" => Some(ArgType::Array),
            "object" | "dict" => Some(ArgType::Object),
            _ => None,
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ArgType::String => value.is_string(),
            ArgType::Integer => value.is_i64() || value.is_u64(),
            ArgType::Number => value.is_number(),
            ArgType::Boolean => value.is_boolean(),
            ArgType::Array => value.is_array(),
            ArgType::Object => value.is_object(),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Integer => "integer",
            ArgType::Number => "number",
            ArgType::Boolean => "boolean",
            ArgType::Array => "array",
            ArgType::Object => "object",
        }
    }
}

/// Render a run-argument schema as a JSON Schema object, for function-calling agents.
pub fn parameters_schema(schema: &ArgSchema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, spec) in schema {
        let mut property = Map::new();
        if let Some(arg_type) = ArgType::parse(&spec.arg_type) {
            property.insert("type".into(), json!(arg_type.label()));
        }
        if !spec.description.is_empty() {
            property.insert("description".into(), json!(spec.description));
        }
        properties.insert(name.clone(), Value::Object(property));
        if spec.required {
            required.push(name.clone());
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ArgSchema {
        let mut schema = ArgSchema::new();
        schema.insert("path".into(), ArgSpec::new("string", "File to read", true));
        schema.insert("limit".into(), ArgSpec::new("int", "", false));
        schema.insert("options".into(), ArgSpec::new("any", "", false));
        schema
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_args() {
        assert!(validate_args(&schema(), &args(json!({"path": "a.txt", "limit": 3}))).is_ok());
        assert!(validate_args(&schema(), &args(json!({"path": "a.txt", "options": [1]}))).is_ok());
    }

    #[test]
    fn test_unknown_args_are_ignored() {
        assert!(validate_args(&schema(), &args(json!({"path": "a", "verbose": true}))).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let err = validate_args(&schema(), &Map::new()).unwrap_err();
        assert_eq!(err, "Error: Invalid arguments. Details: path: field required");
    }

    #[test]
    fn test_type_mismatches_are_all_reported() {
        let err = validate_args(&schema(), &args(json!({"path": 1, "limit": "ten"}))).unwrap_err();
        assert_eq!(
            err,
            "Error: Invalid arguments. Details: limit: value is not a valid integer. path: value is not a valid string"
        );
    }

    #[test]
    fn test_null_optional_is_accepted() {
        assert!(validate_args(&schema(), &args(json!({"path": "a", "limit": null}))).is_ok());
    }

    #[test]
    fn test_parameters_schema() {
        let rendered = parameters_schema(&schema());
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["path"]["type"], "string");
        assert_eq!(rendered["properties"]["path"]["description"], "File to read");
        assert_eq!(rendered["properties"]["limit"]["type"], "integer");
        assert!(rendered["properties"]["options"].get("type").is_none());
        assert_eq!(rendered["required"], json!(["path"]));
    }
}
