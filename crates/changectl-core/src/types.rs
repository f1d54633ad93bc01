//! Records exchanged with the content server
//!
//! Only the fields the client reads are modelled. Unknown fields are ignored
//! and absent optional fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What applying a changeset does to its environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Moves content from the prior environment into this one
    #[default]
    Promotion,
    /// Removes content from this environment
    Deletion,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Promotion => "promotion",
            ActionType::Deletion => "deletion",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment stage in a promotion path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the environment content is promoted from
    #[serde(default)]
    pub prior: Option<String>,
    #[serde(default)]
    pub prior_id: Option<u64>,
    #[serde(default)]
    pub library: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentView {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named bundle of content view changes bound to one environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Changeset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub action_type: ActionType,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub environment_id: u64,
    #[serde(default)]
    pub environment_name: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub content_views: Vec<ContentView>,
}

/// An item the server must bring along when a changeset is applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_of: Option<String>,
}

/// Handle for a long-running server operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncTask {
    pub uuid: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<String>,
}

impl AsyncTask {
    /// Error strings reported by the server for a failed task
    pub fn errors(&self) -> Vec<String> {
        self.result
            .as_ref()
            .and_then(|r| r.get("errors"))
            .and_then(|e| e.as_array())
            .map(|errors| {
                errors
                    .iter()
                    .map(|e| match e.as_str() {
                        Some(s) => s.to_string(),
                        None => e.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
