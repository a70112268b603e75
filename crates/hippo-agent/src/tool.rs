//! Tool framework for agent-facing memory capabilities.
//!
//! This module defines the [`Tool`] trait the memory tools implement and
//! the [`ToolRegistry`] an agent framework binds against.
//!
//! # Example
//!
//! ```rust,ignore
//! use hippo_agent::{Tool, ToolContext, ToolResult, ToolRegistry};
//!
//! let registry = manager.tools();
//! let result = registry
//!     .execute("memory_recall", json!({"query": "editor"}), &ToolContext::default())
//!     .await?;
//! println!("{}", result.to_value());
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Parameter Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for tool parameter validation failures.
///
/// Messages are written for the model: they say what is wrong and how to
/// fix the call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParameterValidationError {
    /// A required parameter is missing.
    #[error("missing required parameter '{name}': {hint}")]
    MissingRequired {
        /// The parameter name.
        name: &'static str,
        /// Hint for the model on how to fix.
        hint: &'static str,
    },

    /// A parameter has an invalid type.
    #[error("invalid type for '{name}': expected {expected}, got {actual}")]
    InvalidType {
        /// The parameter name.
        name: &'static str,
        /// The expected type.
        expected: &'static str,
        /// The actual type found.
        actual: String,
    },

    /// A parameter value is out of range.
    #[error("'{name}' value {value} is out of range: {constraint}")]
    OutOfRange {
        /// The parameter name.
        name: &'static str,
        /// The actual value as string.
        value: String,
        /// Description of the valid range.
        constraint: String,
    },

    /// A parameter value doesn't match the expected enum or shape.
    #[error("'{name}' has invalid value '{value}': {message}")]
    InvalidValue {
        /// The parameter name.
        name: &'static str,
        /// The invalid value.
        value: String,
        /// Why it's invalid.
        message: String,
    },
}

impl ParameterValidationError {
    /// Create a missing required parameter error.
    pub fn missing(name: &'static str, hint: &'static str) -> Self {
        Self::MissingRequired { name, hint }
    }

    /// Create an invalid type error.
    pub fn invalid_type(
        name: &'static str,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            name,
            expected,
            actual: actual.into(),
        }
    }

    /// Create an out of range error.
    pub fn out_of_range(
        name: &'static str,
        value: impl ToString,
        constraint: impl Into<String>,
    ) -> Self {
        Self::OutOfRange {
            name,
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        name: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl From<ParameterValidationError> for AgentError {
    fn from(err: ParameterValidationError) -> Self {
        AgentError::InvalidToolParams(err.to_string())
    }
}

/// Result type for parameter validation.
pub type ParamResult<T> = std::result::Result<T, ParameterValidationError>;

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Helper trait for extracting and validating parameters from JSON.
pub trait ParamExt {
    /// Get a required, non-blank string parameter.
    fn required_str(&self, name: &'static str, hint: &'static str) -> ParamResult<&str>;

    /// Get an optional string parameter. Null counts as absent.
    fn optional_str(&self, name: &'static str) -> ParamResult<Option<&str>>;

    /// Get an optional positive integer parameter.
    fn optional_positive(&self, name: &'static str) -> ParamResult<Option<usize>>;
}

impl ParamExt for serde_json::Value {
    fn required_str(&self, name: &'static str, hint: &'static str) -> ParamResult<&str> {
        match self.optional_str(name)? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ParameterValidationError::missing(name, hint)),
        }
    }

    fn optional_str(&self, name: &'static str) -> ParamResult<Option<&str>> {
        match self.get(name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ParameterValidationError::invalid_type(
                name,
                "string",
                json_type_name(other),
            )),
        }
    }

    fn optional_positive(&self, name: &'static str) -> ParamResult<Option<usize>> {
        match self.get(name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => match value.as_u64() {
                Some(0) => Err(ParameterValidationError::out_of_range(
                    name,
                    0,
                    "must be at least 1",
                )),
                Some(n) => Ok(Some(n as usize)),
                None => Err(ParameterValidationError::invalid_type(
                    name,
                    "positive integer",
                    value.to_string(),
                )),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for agent tools.
///
/// Each tool defines its parameters as a JSON Schema and implements async
/// execution. Missing or malformed parameters are returned as `Err`;
/// runtime failures are returned as [`ToolResult::Error`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of this tool.
    fn name(&self) -> &str;

    /// Get a human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for this tool's parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context provided to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Token to check for cancellation.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a caller-owned cancellation token.
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    /// Check if execution has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Result
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResult {
    /// Successful JSON output.
    Json {
        /// The JSON content.
        content: serde_json::Value,
    },
    /// Tool execution failed.
    Error {
        /// Error message.
        message: String,
    },
}

impl ToolResult {
    /// Create a JSON result.
    pub fn json(content: serde_json::Value) -> Self {
        Self::Json { content }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Check if this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The JSON-compatible result object handed back to the agent framework.
    ///
    /// Errors render as `{"error": "..."}`.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Self::Json { content } => content.clone(),
            Self::Error { message } => serde_json::json!({ "error": message }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Registry
// ─────────────────────────────────────────────────────────────────────────────

/// A tool's name, description and parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema of the parameters.
    pub parameters: serde_json::Value,
}

/// Registry for managing available tools.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Get all tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Definitions of all tools, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tool.execute(params, ctx).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the message back"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            })
        }

        async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult> {
            if ctx.is_cancelled() {
                return Ok(ToolResult::error("Operation cancelled"));
            }
            let message = params.required_str("message", "provide a message to echo")?;
            Ok(ToolResult::json(json!({ "message": message })))
        }
    }

    #[test]
    fn test_tool_result_values() {
        assert_eq!(ToolResult::json(json!({"a": 1})).to_value(), json!({"a": 1}));
        let err = ToolResult::error("boom");
        assert!(err.is_error());
        assert_eq!(err.to_value(), json!({"error": "boom"}));
    }

    #[test]
    fn test_tool_result_serialization() {
        let json = serde_json::to_string(&ToolResult::error("boom")).unwrap();
        assert!(json.contains("\"type\":\"error\""));
    }

    #[test]
    fn test_param_ext() {
        let params = json!({"query": "tea", "blank": "  ", "limit": 3, "zero": 0, "num": 5});
        assert_eq!(params.required_str("query", "hint").unwrap(), "tea");
        assert!(matches!(
            params.required_str("blank", "hint"),
            Err(ParameterValidationError::MissingRequired { name: "blank", .. })
        ));
        assert!(matches!(
            params.optional_str("num"),
            Err(ParameterValidationError::InvalidType { .. })
        ));
        assert_eq!(params.optional_str("missing").unwrap(), None);
        assert_eq!(params.optional_positive("limit").unwrap(), Some(3));
        assert!(params.optional_positive("zero").is_err());
        assert_eq!(params.optional_positive("absent").unwrap(), None);
    }

    #[test]
    fn test_param_error_into_agent_error() {
        let err: AgentError = ParameterValidationError::missing("query", "provide a query").into();
        assert!(matches!(err, AgentError::InvalidToolParams(_)));
        assert!(err.to_string().contains("query"));
    }

    #[tokio::test]
    async fn test_registry_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        assert_eq!(registry.names(), vec!["echo"]);
        assert_eq!(registry.definitions()[0].name, "echo");

        let ctx = ToolContext::new();
        let result = registry
            .execute("echo", json!({"message": "hello"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.to_value(), json!({"message": "hello"}));

        let missing = registry.execute("echo", json!({}), &ctx).await;
        assert!(matches!(missing, Err(AgentError::InvalidToolParams(_))));

        let unknown = registry.execute("nope", json!({}), &ctx).await;
        assert!(matches!(unknown, Err(AgentError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ToolContext::with_cancellation(token);
        let result = EchoTool.execute(json!({"message": "x"}), &ctx).await.unwrap();
        assert!(result.is_error());
    }
}
