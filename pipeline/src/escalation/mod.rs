//! Task escalation — model and engine.

pub mod engine;
pub mod task;

pub use engine::EscalationEngine;
pub use task::{
    AssignmentRecord, HistoryAction, HistoryEntry, Task, TaskFilter, TaskPriority, TaskStatus,
    SYSTEM_ACTOR,
};
