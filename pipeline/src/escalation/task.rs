//! Task model — status state machine, priority, and audit trails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actor identifier recorded on automated history entries.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

/// Lifecycle state of a remediation task.
///
/// Transitions are monotonic forward except reassignment, which returns an
/// in-flight task to the active queue:
/// ```text
/// Open → InProgress (start work, external)
/// Open → Resolved (resolve)
/// InProgress → Resolved (resolve)
/// Resolved → Verified (verify, external)
/// InProgress → Open (reassign)
/// Resolved → Open (reassign)
/// ```
/// `Open` is the only creation state; `Verified` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Open,
    InProgress,
    Resolved,
    Verified,
}

impl TaskStatus {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified)
    }

    /// Whether reassignment returns a task in this state to `Open`.
    /// `Verified` is final and is deliberately left untouched.
    pub fn resets_on_reassign(self) -> bool {
        matches!(self, Self::InProgress | Self::Resolved)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Verified => write!(f, "VERIFIED"),
        }
    }
}

/// Legal edges in the task status graph.
pub fn is_legal_transition(from: TaskStatus, to: TaskStatus) -> bool {
    use TaskStatus::*;
    matches!(
        (from, to),
        (Open, InProgress)
            | (Open, Resolved)
            | (InProgress, Resolved)
            | (Resolved, Verified)
            | (InProgress, Open)
            | (Resolved, Open)
    )
}

/// Task priority. The variant order doubles as the sort order: `High`
/// sorts before `Medium` sorts before `Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    High,
    Medium,
    /// Never assigned automatically — reserved for manual downgrade.
    Low,
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// What a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Created,
    Resolved,
    Reassigned,
}

/// Append-only audit entry. Exactly one is added per task creation,
/// resolution, and reassignment; entries are never edited or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: HistoryAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
}

impl HistoryEntry {
    pub fn new(action: HistoryAction, actor: impl Into<String>, note: Option<String>) -> Self {
        Self {
            action,
            note,
            timestamp: Utc::now(),
            actor: actor.into(),
        }
    }
}

/// Append-only record of one reassignment, capturing the assignee *before*
/// the change was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    /// The previous assignee being replaced.
    pub assigned_to: String,
    /// The actor who performed the reassignment.
    pub assigned_by: String,
    pub assigned_at: DateTime<Utc>,
    pub reason: String,
}

/// A unit of remediation work tied 1:1 to the response that triggered it.
///
/// Created by the escalation engine, mutated only by resolve/reassign, never
/// deleted: `Resolved`/`Verified` tasks are retained for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<Uuid>,
    pub response_id: Uuid,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Email of the current assignee; mutable via reassignment.
    pub assigned_to: String,
    pub assignment_history: Vec<AssignmentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_proof_url: Option<String>,
    pub history: Vec<HistoryEntry>,
    /// Fixed at creation to `created_at + 24h`; never altered afterwards.
    pub sla_breach_at: DateTime<Utc>,
    /// Operator-set deadline, independent of the SLA clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Filters for task queries. All fields are conjunctive; `None` matches
/// everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
    pub location_id: Option<Uuid>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if task.priority != priority {
                return false;
            }
        }
        if let Some(assigned_to) = &self.assigned_to {
            if &task.assigned_to != assigned_to {
                return false;
            }
        }
        if let Some(location_id) = self.location_id {
            if task.location_id != Some(location_id) {
                return false;
            }
        }
        true
    }
}
