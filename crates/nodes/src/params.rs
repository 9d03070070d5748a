//! Small accessors over a resolved parameter map, shared by every built-in
//! node. Parameters have already passed schema validation and expression
//! resolution by the time an executor sees them (spec §4.2 precondition).

use flowcore_error::NodeError;
use serde_json::{Map, Value};

pub fn required<'a>(parameters: &'a Map<String, Value>, name: &str) -> Result<&'a Value, NodeError> {
    parameters
        .get(name)
        .ok_or_else(|| NodeError::validation(format!("missing required parameter: {name}")))
}

pub fn str_param<'a>(parameters: &'a Map<String, Value>, name: &str) -> Result<&'a str, NodeError> {
    required(parameters, name)?
        .as_str()
        .ok_or_else(|| NodeError::validation(format!("parameter {name} must be a string")))
}

pub fn bool_param(parameters: &Map<String, Value>, name: &str, default: bool) -> bool {
    parameters.get(name).and_then(Value::as_bool).unwrap_or(default)
}

pub fn array_param<'a>(parameters: &'a Map<String, Value>, name: &str) -> Result<&'a [Value], NodeError> {
    required(parameters, name)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| NodeError::validation(format!("parameter {name} must be an array")))
}

pub fn opt_str<'a>(parameters: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    parameters.get(name).and_then(Value::as_str)
}

/// JavaScript-style truthiness, used to coerce an If/Switch value into a
/// boolean branch decision (spec §4.7: "routes by the boolean coercion of
/// the evaluated condition").
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_matches_js_semantics() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!(1)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("x")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!([1])));
    }

    #[test]
    fn required_missing_is_validation_error() {
        let parameters = Map::new();
        let err = required(&parameters, "url").unwrap_err();
        assert_eq!(err.kind, flowcore_error::NodeErrorKind::Validation);
    }

    #[test]
    fn str_param_rejects_wrong_type() {
        let mut parameters = Map::new();
        parameters.insert("x".into(), json!(1));
        assert!(str_param(&parameters, "x").is_err());
    }

    #[test]
    fn bool_param_falls_back_to_default() {
        let parameters = Map::new();
        assert!(!bool_param(&parameters, "flag", false));
        assert!(bool_param(&parameters, "flag", true));
    }
}
