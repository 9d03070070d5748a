//! Parameter schema (spec §4.2: `NodeDefinition` parameter list).

use flowcore_error::NodeError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The declared type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Code,
    Collection,
    Select,
    Multiselect,
}

/// Numeric/length/pattern constraints checked during schema validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterValidation {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub regex: Option<String>,
}

/// A predicate over sibling parameter values controlling whether a
/// parameter is shown/required in the authoring UI. The core enforces it
/// during validation: hidden parameters are exempt from required/type
/// checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalVisibility {
    pub depends_on: String,
    pub equals: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub display_name: String,
    pub parameter_type: ParameterType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub validation: ParameterValidation,
    #[serde(default)]
    pub visible_when: Option<ConditionalVisibility>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            parameter_type,
            required: false,
            default: None,
            validation: ParameterValidation::default(),
            visible_when: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_validation(mut self, validation: ParameterValidation) -> Self {
        self.validation = validation;
        self
    }

    pub fn visible_when(mut self, depends_on: impl Into<String>, equals: Value) -> Self {
        self.visible_when = Some(ConditionalVisibility {
            depends_on: depends_on.into(),
            equals,
        });
        self
    }

    /// Whether this parameter is active given already-resolved sibling
    /// values, per its `visible_when` predicate.
    #[must_use]
    pub fn is_visible(&self, siblings: &std::collections::HashMap<String, Value>) -> bool {
        match &self.visible_when {
            None => true,
            Some(cond) => siblings.get(&cond.depends_on) == Some(&cond.equals),
        }
    }

    fn visible_against(&self, resolved: &Map<String, Value>) -> bool {
        match &self.visible_when {
            None => true,
            Some(cond) => resolved.get(&cond.depends_on) == Some(&cond.equals),
        }
    }

    fn type_matches(&self, value: &Value) -> bool {
        match self.parameter_type {
            ParameterType::String | ParameterType::Code | ParameterType::Select => value.is_string(),
            ParameterType::Number => value.is_number(),
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Object => value.is_object(),
            ParameterType::Array | ParameterType::Collection | ParameterType::Multiselect => value.is_array(),
        }
    }

    /// Checks a resolved parameter value against this declaration: presence
    /// (respecting `visible_when`), declared type, and `validation`
    /// constraints. Called by the engine as a precondition to execution
    /// (spec §4.2).
    pub(crate) fn validate(&self, resolved: &Map<String, Value>) -> Result<(), NodeError> {
        if !self.visible_against(resolved) {
            return Ok(());
        }

        let Some(value) = resolved.get(&self.name).filter(|v| !v.is_null()) else {
            return if self.required {
                Err(NodeError::validation(format!("missing required parameter: {}", self.name)))
            } else {
                Ok(())
            };
        };

        if !self.type_matches(value) {
            return Err(NodeError::validation(format!(
                "parameter {} must be a {:?}",
                self.name, self.parameter_type
            )));
        }

        self.validation.check(&self.name, value)
    }
}

impl ParameterValidation {
    fn check(&self, name: &str, value: &Value) -> Result<(), NodeError> {
        if let Some(text) = value.as_str() {
            let len = text.chars().count();
            if let Some(min) = self.min_length {
                if len < min {
                    return Err(NodeError::validation(format!("parameter {name} must be at least {min} characters")));
                }
            }
            if let Some(max) = self.max_length {
                if len > max {
                    return Err(NodeError::validation(format!("parameter {name} must be at most {max} characters")));
                }
            }
            if let Some(pattern) = &self.regex {
                let re = regex::Regex::new(pattern)
                    .map_err(|err| NodeError::validation(format!("parameter {name} has an invalid regex pattern: {err}")))?;
                if !re.is_match(text) {
                    return Err(NodeError::validation(format!("parameter {name} does not match pattern {pattern:?}")));
                }
            }
        }

        if let Value::Array(items) = value {
            if let Some(min) = self.min_length {
                if items.len() < min {
                    return Err(NodeError::validation(format!("parameter {name} must have at least {min} item(s)")));
                }
            }
            if let Some(max) = self.max_length {
                if items.len() > max {
                    return Err(NodeError::validation(format!("parameter {name} must have at most {max} item(s)")));
                }
            }
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = self.min {
                if n < min {
                    return Err(NodeError::validation(format!("parameter {name} must be >= {min}")));
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    return Err(NodeError::validation(format!("parameter {name} must be <= {max}")));
                }
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDefinition {
    pub name: String,
    pub parameter_type: ParameterType,
}

impl OutputDefinition {
    pub fn new(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            parameter_type,
        }
    }
}
