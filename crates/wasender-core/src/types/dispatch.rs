//! Bulk dispatch jobs and their reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Contact;
use crate::error::{Result, SenderError};

/// Message body with `{placeholder}` tokens. Immutable per batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MessageTemplate(String);

impl MessageTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for MessageTemplate {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A batch submitted to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchJob {
    pub contacts: Vec<Contact>,
    pub template: MessageTemplate,
    /// Alternative templates; each contact gets one of `template` + `variants`.
    #[serde(default)]
    pub variants: Vec<MessageTemplate>,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Attachment source, fetched once before the first send.
    #[serde(default)]
    pub media_url: Option<String>,
}

impl DispatchJob {
    pub fn new(contacts: Vec<Contact>, template: impl Into<MessageTemplate>) -> Self {
        Self {
            contacts,
            template: template.into(),
            variants: vec![],
            min_delay_ms: 0,
            max_delay_ms: 0,
            media_url: None,
        }
    }

    pub fn with_delay(mut self, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.min_delay_ms = min_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn with_variants(mut self, variants: Vec<MessageTemplate>) -> Self {
        self.variants = variants;
        self
    }

    pub fn with_media(mut self, url: impl Into<String>) -> Self {
        self.media_url = Some(url.into());
        self
    }

    /// Check the submission invariants. Individual contact numbers are not
    /// checked here; an unusable number becomes a `Failed` result.
    pub fn validate(&self) -> Result<()> {
        if self.contacts.is_empty() {
            return Err(SenderError::validation("contact list is empty"));
        }
        if self.template.is_blank() {
            return Err(SenderError::validation("message template is empty"));
        }
        if self.variants.iter().any(MessageTemplate::is_blank) {
            return Err(SenderError::validation("message variants must not be empty"));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(SenderError::validation(format!(
                "minDelayMs ({}) must not exceed maxDelayMs ({})",
                self.min_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    /// All templates a contact may receive.
    pub fn templates(&self) -> Vec<&MessageTemplate> {
        std::iter::once(&self.template).chain(self.variants.iter()).collect()
    }
}

/// Outcome of one contact's send attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Sent,
    Failed,
}

/// One entry per contact, immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub number: String,
    pub name: String,
    pub status: DispatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl DispatchResult {
    pub fn sent(contact: &Contact, message_id: Option<String>) -> Self {
        Self {
            number: contact.number.clone(),
            name: contact.name.clone(),
            status: DispatchStatus::Sent,
            error: None,
            message_id,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(contact: &Contact, error: impl Into<String>) -> Self {
        Self {
            number: contact.number.clone(),
            name: contact.name.clone(),
            status: DispatchStatus::Failed,
            error: Some(error.into()),
            message_id: None,
            completed_at: Utc::now(),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == DispatchStatus::Sent
    }
}

/// Identifier of a submitted job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = SenderError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| SenderError::JobNotFound(s.to_string()))
    }
}

/// Lifecycle of a job: `Queued → Running → Completed | Cancelled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }
}

/// Snapshot of a job's progress and per-contact outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    /// Whether the batch went out with an attachment.
    pub media_attached: bool,
    pub results: Vec<DispatchResult>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobReport {
    pub fn pending(&self) -> usize {
        self.total.saturating_sub(self.results.len())
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.job_id,
            status: self.status,
            total: self.total,
            sent: self.sent,
            failed: self.failed,
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// Report without the per-contact entries, for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}
