//! **HTTPRequest** — integration; issues an HTTP call through `reqwest`
//! (spec §4.7). A response that the transport actually received — even a
//! non-2xx one — is a successful node execution; `isSuccess` in the
//! output carries the HTTP-level verdict. Only a transport failure
//! (connection refused, DNS, TLS, timeout) becomes a `NodeResult::Error`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use flowcore_core::Key;
use flowcore_error::{NodeError, NodeErrorKind};
use flowcore_node::{ExecutionContext, NodeDefinition, NodeExecutor, NodeResult, ParameterDefinition, ParameterType};
use reqwest::Method;
use serde_json::{Map, Value};
use std::str::FromStr;
use url::Url;

use crate::params::{opt_str, str_param};

pub struct HttpRequestExecutor {
    definition: NodeDefinition,
}

impl HttpRequestExecutor {
    pub fn new() -> Self {
        Self {
            definition: NodeDefinition::new(Key::from_str("http_request").unwrap(), "HTTP Request", "integration").with_parameters(vec![
                ParameterDefinition::new("url", "URL", ParameterType::String).required(),
                ParameterDefinition::new("method", "Method", ParameterType::String).with_default(Value::String("GET".into())),
                ParameterDefinition::new("timeoutSeconds", "Timeout (seconds)", ParameterType::Number).with_default(Value::from(30)),
                ParameterDefinition::new("headers", "Headers", ParameterType::Object),
                ParameterDefinition::new("auth", "Authentication", ParameterType::Object),
                ParameterDefinition::new("body", "Body", ParameterType::Object),
            ]),
        }
    }
}

impl Default for HttpRequestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_method(raw: &str) -> Result<Method, NodeError> {
    Method::from_bytes(raw.as_bytes()).map_err(|_| NodeError::validation(format!("unsupported HTTP method {raw:?}")))
}

fn header_map(parameters: &Map<String, Value>) -> HashMap<String, String> {
    parameters
        .get("headers")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn apply_auth(mut builder: reqwest::RequestBuilder, parameters: &Map<String, Value>) -> Result<reqwest::RequestBuilder, NodeError> {
    let Some(auth) = parameters.get("auth").and_then(Value::as_object) else {
        return Ok(builder);
    };
    match auth.get("type").and_then(Value::as_str) {
        Some("basic") => {
            let username = auth.get("username").and_then(Value::as_str).unwrap_or_default();
            let password = auth.get("password").and_then(Value::as_str);
            builder = builder.basic_auth(username, password);
        }
        Some("bearer") => {
            let token = auth
                .get("token")
                .and_then(Value::as_str)
                .ok_or_else(|| NodeError::validation("bearer auth requires a token"))?;
            builder = builder.bearer_auth(token);
        }
        Some("none") | None => {}
        Some(other) => return Err(NodeError::validation(format!("unsupported auth type {other:?}"))),
    }
    Ok(builder)
}

#[async_trait]
impl NodeExecutor for HttpRequestExecutor {
    fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    async fn execute(&self, parameters: Map<String, Value>, _context: &ExecutionContext) -> NodeResult {
        let url = match str_param(&parameters, "url") {
            Ok(url) => url,
            Err(err) => return NodeResult::error(err),
        };
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(err) => return NodeResult::error(NodeError::validation(format!("url is not a valid URL: {err}"))),
        };
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return NodeResult::error(NodeError::validation("url must use the http or https scheme"));
        }

        let method_raw = opt_str(&parameters, "method").unwrap_or("GET");
        let method = match parse_method(method_raw) {
            Ok(m) => m,
            Err(err) => return NodeResult::error(err),
        };

        let timeout_secs = parameters
            .get("timeoutSeconds")
            .and_then(Value::as_u64)
            .unwrap_or(30)
            .clamp(1, 300);

        let client = match reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs)).build() {
            Ok(client) => client,
            Err(err) => return NodeResult::error(NodeError::new(NodeErrorKind::External, "failed to build HTTP client").with_cause(err.to_string())),
        };

        let mut builder = client.request(method, parsed);
        for (key, value) in header_map(&parameters) {
            builder = builder.header(key, value);
        }
        builder = match apply_auth(builder, &parameters) {
            Ok(b) => b,
            Err(err) => return NodeResult::error(err),
        };
        if let Some(body) = parameters.get("body") {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let kind = if err.is_timeout() { NodeErrorKind::Timeout } else { NodeErrorKind::External };
                return NodeResult::error(NodeError::new(kind, "HTTP request failed").with_cause(err.to_string()));
            }
        };

        let status = response.status();
        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), Value::String(v.to_string()))))
            .collect();

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => return NodeResult::error(NodeError::new(NodeErrorKind::External, "failed to read response body").with_cause(err.to_string())),
        };

        let body = if content_type.contains("application/json") {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        } else {
            match std::str::from_utf8(&bytes) {
                Ok(text) => Value::String(text.to_string()),
                Err(_) => Value::Null,
            }
        };

        let mut output = Map::new();
        output.insert("statusCode".into(), Value::from(status.as_u16()));
        output.insert(
            "statusText".into(),
            Value::String(status.canonical_reason().unwrap_or_default().to_string()),
        );
        output.insert("headers".into(), Value::Object(headers));
        output.insert("body".into(), body);
        output.insert("isSuccess".into(), Value::Bool(status.is_success()));

        NodeResult::success(Value::Object(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore_core::{ExecutionId, NodeExecutionId, WorkflowId};

    fn test_context() -> ExecutionContext {
        ExecutionContext::new(ExecutionId::v4(), NodeExecutionId::v4(), WorkflowId::v4(), Key::from_str("http_request").unwrap())
    }

    #[tokio::test]
    async fn rejects_url_without_scheme() {
        let executor = HttpRequestExecutor::new();
        let mut parameters = Map::new();
        parameters.insert("url".into(), Value::String("example.com".into()));
        let result = executor.execute(parameters, &test_context()).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn rejects_unsupported_method() {
        let executor = HttpRequestExecutor::new();
        let mut parameters = Map::new();
        parameters.insert("url".into(), Value::String("https://example.com".into()));
        parameters.insert("method".into(), Value::String("NOT-A-METHOD!!".into()));
        let result = executor.execute(parameters, &test_context()).await;
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn connection_failure_is_external_error() {
        let executor = HttpRequestExecutor::new();
        let mut parameters = Map::new();
        parameters.insert("url".into(), Value::String("http://127.0.0.1:1".into()));
        parameters.insert("timeoutSeconds".into(), Value::from(1));
        let result = executor.execute(parameters, &test_context()).await;
        match result {
            NodeResult::Error { error } => assert!(matches!(error.kind, NodeErrorKind::External | NodeErrorKind::Timeout)),
            NodeResult::Success { .. } => panic!("expected a transport failure"),
        }
    }

    #[tokio::test]
    async fn missing_auth_token_is_validation_error() {
        let executor = HttpRequestExecutor::new();
        let mut parameters = Map::new();
        parameters.insert("url".into(), Value::String("https://example.com".into()));
        let mut auth = Map::new();
        auth.insert("type".into(), Value::String("bearer".into()));
        parameters.insert("auth".into(), Value::Object(auth));
        let result = executor.execute(parameters, &test_context()).await;
        assert!(!result.is_success());
    }
}
