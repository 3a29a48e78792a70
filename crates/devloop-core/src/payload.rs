//! Hook invocation payloads.
//!
//! Assistants call the guard from a pre-tool-use hook with a JSON object on
//! stdin naming the tool and its input:
//!
//! ```json
//! {"tool_name": "Write", "tool_input": {"file_path": "AGENTS.md"}, "cwd": "/proj"}
//! ```

use crate::error::{DevloopError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// The kind of tool operation being guarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Write,
    Edit,
    MultiEdit,
    NotebookEdit,
    /// Any tool that does not modify files (`Read`, `Grep`, ...).
    Other(String),
}

impl Action {
    pub fn from_tool_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "write" => Action::Write,
            "edit" => Action::Edit,
            "multiedit" | "multi_edit" => Action::MultiEdit,
            "notebookedit" | "notebook_edit" => Action::NotebookEdit,
            _ => Action::Other(name.trim().to_string()),
        }
    }

    pub fn is_mutating(&self) -> bool {
        !matches!(self, Action::Other(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Write => f.write_str("Write"),
            Action::Edit => f.write_str("Edit"),
            Action::MultiEdit => f.write_str("MultiEdit"),
            Action::NotebookEdit => f.write_str("NotebookEdit"),
            Action::Other(name) => f.write_str(name),
        }
    }
}

// ---------------------------------------------------------------------------
// GuardRequest
// ---------------------------------------------------------------------------

/// A parsed guard invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRequest {
    pub action: Action,
    /// Target path as supplied by the caller. `None` only for non-mutating actions.
    pub path: Option<PathBuf>,
    /// Working directory reported by the host, used for root discovery.
    pub cwd: Option<PathBuf>,
}

impl GuardRequest {
    pub fn new(action: Action, path: impl Into<PathBuf>) -> Self {
        Self {
            action,
            path: Some(path.into()),
            cwd: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct HookPayload {
    tool_name: String,
    #[serde(default)]
    tool_input: Option<ToolInput>,
    #[serde(default)]
    cwd: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolInput {
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    notebook_path: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

impl ToolInput {
    fn target(self) -> Option<String> {
        [self.file_path, self.notebook_path, self.path]
            .into_iter()
            .flatten()
            .find(|p| !p.trim().is_empty())
    }
}

/// Parse a hook payload. Every failure is [`DevloopError::InvalidPayload`] or
/// [`DevloopError::Json`]; callers treat both as fail-open.
pub fn parse(data: &str) -> Result<GuardRequest> {
    if data.trim().is_empty() {
        return Err(DevloopError::InvalidPayload("empty input".to_string()));
    }
    let payload: HookPayload = serde_json::from_str(data)?;
    if payload.tool_name.trim().is_empty() {
        return Err(DevloopError::InvalidPayload("empty tool_name".to_string()));
    }

    let action = Action::from_tool_name(&payload.tool_name);
    let path = payload.tool_input.and_then(ToolInput::target).map(PathBuf::from);

    if action.is_mutating() && path.is_none() {
        return Err(DevloopError::InvalidPayload(format!(
            "{action} payload has no target path"
        )));
    }

    Ok(GuardRequest {
        action,
        path,
        cwd: payload.cwd.filter(|c| !c.as_os_str().is_empty()),
    })
}
