//! Provisioning job model: the pollable record behind a token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque handle returned at submission time
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobToken(String);

impl JobToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Terminal states are absorbing
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// One entry of the presentation info shown to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoEntry {
    #[serde(rename = "type")]
    pub entry_type: InfoEntryType,
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoEntryType {
    String,
    Link,
}

impl InfoEntry {
    pub fn text(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            entry_type: InfoEntryType::String,
            label: label.into(),
            value: value.into(),
            href: None,
        }
    }

    pub fn link(label: impl Into<String>, value: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            entry_type: InfoEntryType::Link,
            label: label.into(),
            value: value.into(),
            href: Some(href.into()),
        }
    }
}

/// Key → entry map surfaced with a completed job
pub type ProvisioningInfo = BTreeMap<String, InfoEntry>;

/// Status record of a submitted request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningJob {
    pub token: JobToken,
    pub status: JobStatus,
    pub result_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<ProvisioningInfo>,
    /// Descriptor updates proposed by reverse provisioning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updates: Option<serde_json::Value>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProvisioningJob {
    pub fn running(token: JobToken) -> Self {
        Self {
            token,
            status: JobStatus::Running,
            result_message: String::new(),
            info: None,
            updates: None,
            submitted_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Terminal record for a token nobody issued
    pub fn not_found(token: JobToken) -> Self {
        let message = format!("No provisioning job found for token '{token}'");
        Self {
            token,
            status: JobStatus::Failed,
            result_message: message,
            info: None,
            updates: None,
            submitted_at: Utc::now(),
            completed_at: Some(Utc::now()),
        }
    }

    pub fn completed(mut self, message: impl Into<String>, info: Option<ProvisioningInfo>) -> Self {
        self.status = JobStatus::Completed;
        self.result_message = message.into();
        self.info = info;
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.result_message = message.into();
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn with_updates(mut self, updates: serde_json::Value) -> Self {
        self.updates = Some(updates);
        self
    }
}
