//! Tools exposed to agents.
//!
//! Corresponds to `crewai_tools/tools/rag/` and the `BaseTool` contract from
//! `crewai/tools/`.

pub mod base_tool;
pub mod rag_tool;

pub use base_tool::{BaseTool, EnvVar, ToolError};
pub use rag_tool::RagTool;
