//! `NodeDefinition`: the static description a node kind registers under
//! (spec §4.2).

use flowcore_core::Key;
use flowcore_error::NodeError;
use serde_json::{Map, Value};

use crate::parameter::{OutputDefinition, ParameterDefinition};

/// Declared capabilities a node kind advertises to the engine; e.g. a
/// trigger node has no inbound edges and seeds the execution's root
/// context instead of consuming one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCapabilities {
    pub is_trigger: bool,
    pub supports_webhook: bool,
}

#[derive(Debug, Clone)]
pub struct NodeDefinition {
    pub kind_key: Key,
    pub display_name: String,
    pub category: String,
    pub parameters: Vec<ParameterDefinition>,
    pub outputs: Vec<OutputDefinition>,
    pub capabilities: NodeCapabilities,
}

impl NodeDefinition {
    pub fn new(kind_key: Key, display_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            kind_key,
            display_name: display_name.into(),
            category: category.into(),
            parameters: Vec::new(),
            outputs: Vec::new(),
            capabilities: NodeCapabilities::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterDefinition>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<OutputDefinition>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_capabilities(mut self, capabilities: NodeCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Checks `resolved` against every declared parameter: required-ness
    /// (respecting `visible_when`), declared type, and `validation`
    /// constraints. The engine runs this after parameter resolution and
    /// before handing `resolved` to the executor (spec §4.2).
    ///
    /// # Errors
    ///
    /// Returns the first violated parameter's `NodeErrorKind::Validation` error.
    pub fn validate_parameters(&self, resolved: &Map<String, Value>) -> Result<(), NodeError> {
        for parameter in &self.parameters {
            parameter.validate(resolved)?;
        }
        Ok(())
    }
}
