//! Base tool definitions.
//!
//! Corresponds to `crewai/tools/base_tool.py` as used by `crewai_tools`.
//!
//! Provides `EnvVar`, the `ToolError` type and the `BaseTool` trait that
//! every tool in this crate implements.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::rag::error::RagError;

// ---------------------------------------------------------------------------
// EnvVar
// ---------------------------------------------------------------------------

/// Environment variable definition used by a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Name of the environment variable.
    pub name: String,
    /// Human-readable description of the environment variable.
    pub description: String,
    /// Whether the environment variable is required.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Default value if the environment variable is not set.
    #[serde(default)]
    pub default: Option<String>,
}

fn default_true() -> bool {
    true
}

impl EnvVar {
    /// Create a new required environment variable.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// Create an optional environment variable.
    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::new(name, description)
        }
    }

    /// Create a new optional environment variable with a default value.
    pub fn with_default(
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            default: Some(default.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ToolError
// ---------------------------------------------------------------------------

/// Errors a tool invocation can produce.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error(transparent)]
    Rag(#[from] RagError),
}

/// Fetch a required string argument.
pub fn required_str_arg<'a>(
    args: &'a HashMap<String, Value>,
    name: &str,
) -> Result<&'a str, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Err(ToolError::MissingArgument(name.to_string())),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ToolError::InvalidArgument {
            name: name.to_string(),
            message: format!("expected a string, got {}", other),
        }),
    }
}

// ---------------------------------------------------------------------------
// BaseTool trait
// ---------------------------------------------------------------------------

/// A tool an agent can call.
#[async_trait]
pub trait BaseTool: Send + Sync + fmt::Debug {
    /// The unique name of the tool that clearly communicates its purpose.
    fn name(&self) -> &str;

    /// Description used to tell the model how/when/why to use the tool.
    fn description(&self) -> &str;

    /// JSON schema for the arguments that the tool accepts.
    fn args_schema(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    /// List of environment variables used by the tool.
    fn env_vars(&self) -> &[EnvVar] {
        &[]
    }

    /// Whether the tool result should be the final agent answer.
    fn result_as_answer(&self) -> bool {
        false
    }

    /// Execute the tool.
    async fn run(&self, args: HashMap<String, Value>) -> Result<Value, ToolError>;
}
