//! Feedback Ingestion & Escalation Pipeline
//!
//! Turns raw customer feedback submissions into persisted responses, owner
//! alerts, outbound webhooks, and tracked remediation tasks.
//!
//! # Components
//!
//! - [`metrics`]: schema-driven NPS/CSAT extraction and alert gating
//! - [`notify`]: retrying notification dispatcher over a pluggable transport
//! - [`escalation`]: task model and the engine that creates, resolves,
//!   reassigns, and queries remediation tasks
//! - [`ingest`]: the submission orchestrator that persists responses and
//!   fans out to the dispatcher and the engine in the background
//! - [`api`]: governance-gated boundary in front of the task engine
//! - [`store`]: persistence traits plus the in-memory backend
//!
//! # Flow
//!
//! A submission enters through [`ingest::Orchestrator::submit`]. The
//! orchestrator resolves the tenant and form, extracts [`model::Metrics`]
//! from the answers, persists the [`model::Response`], and returns. Alerting,
//! webhook delivery and task escalation all happen after acknowledgment in
//! detached tasks; none of them can fail a submission.

pub mod api;
pub mod config;
pub mod error;
pub mod escalation;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod store;

pub use api::TaskApi;
pub use config::{DispatcherConfig, OperatingMode, PipelineConfig, RetryPolicy};
pub use error::{PipelineError, PipelineResult, StorageError};
pub use escalation::{EscalationEngine, Task, TaskFilter, TaskPriority, TaskStatus};
pub use ingest::{Orchestrator, SubmitReceipt, Submission};
pub use model::{Metrics, Response, Tenant};
pub use notify::{Dispatcher, DispatchOutcome, HttpTransport, NotificationTransport};
pub use store::MemoryBackend;
