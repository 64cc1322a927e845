//! Task records and the reserved task-namespace discriminants.

use serde::{Deserialize, Serialize};

/// A task record as pushed by the server on create/update events.
///
/// Only the identifier is required; the remaining fields mirror what the
/// backend includes on pushes and tolerate older backends that omit them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// The discriminants reserved for the task namespace.
///
/// Everything else on the wire dispatches through the generic namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskEvent {
    Created,
    Updated,
}

impl TaskEvent {
    /// The wire discriminant for this event.
    pub fn discriminant(self) -> &'static str {
        match self {
            TaskEvent::Created => "task_created",
            TaskEvent::Updated => "task_updated",
        }
    }

    /// Map a wire discriminant onto the task namespace, if it belongs there.
    pub fn from_discriminant(kind: &str) -> Option<Self> {
        match kind {
            "task_created" => Some(TaskEvent::Created),
            "task_updated" => Some(TaskEvent::Updated),
            _ => None,
        }
    }
}
