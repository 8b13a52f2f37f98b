//! Notification transport seam.
//!
//! The dispatcher does not depend on a specific provider's wire format; it
//! only needs "send a templated message to a contact" and "POST JSON to a
//! URL", plus a status code on failure for error classification.

use crate::config::DispatcherConfig;
use crate::escalation::task::TaskPriority;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Failure of a single outbound attempt.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The remote end answered with a non-success HTTP status.
    #[error("upstream returned status {status}")]
    Status { status: u16 },

    /// Connection, DNS, or timeout failure — no status available.
    #[error("transport failure: {0}")]
    Network(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            Self::Network(_) => None,
        }
    }

    /// Client errors are not transient: 4xx aborts the retry loop, with the
    /// exception of 429 which is worth retrying.
    pub fn is_permanent(&self) -> bool {
        match self.status() {
            Some(status) => (400..500).contains(&status) && status != 429,
            None => false,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status {
                status: status.as_u16(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

/// Template body for a contact message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "template")]
pub enum MessageTemplate {
    /// Low-score alert to the tenant owner.
    LowScoreAlert {
        tenant_name: String,
        nps_score: i32,
        order_id: Option<String>,
        customer_phone: Option<String>,
    },
    /// New-task notification to the assignee.
    TaskAssigned {
        tenant_name: String,
        /// Display name of the store the feedback came from, when resolvable.
        location_name: Option<String>,
        task_id: Uuid,
        response_id: Uuid,
        priority: TaskPriority,
        sla_breach_at: DateTime<Utc>,
    },
}

/// A templated message addressed to a single contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactMessage {
    /// Phone or email of the recipient, depending on the provider.
    pub to: String,
    #[serde(flatten)]
    pub template: MessageTemplate,
}

/// Abstract outbound capability supplied by the environment.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send_message(&self, message: &ContactMessage) -> Result<(), TransportError>;

    async fn post_webhook(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError>;
}

/// Reqwest-backed transport against a messaging-provider API.
///
/// The client is built once at construction with the per-attempt timeout and
/// injected into the dispatcher — there is no lazily-initialized global.
pub struct HttpTransport {
    client: reqwest::Client,
    alert_endpoint: String,
    alert_api_token: String,
}

impl HttpTransport {
    pub fn new(config: &DispatcherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            alert_endpoint: config.alert_endpoint.clone(),
            alert_api_token: config.alert_api_token.clone(),
        })
    }
}

#[async_trait]
impl NotificationTransport for HttpTransport {
    async fn send_message(&self, message: &ContactMessage) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.alert_endpoint)
            .bearer_auth(&self.alert_api_token)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn post_webhook(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<(), TransportError> {
        let response = self.client.post(url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
