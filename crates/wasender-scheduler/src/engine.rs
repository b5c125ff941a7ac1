//! Bulk dispatch engine.
//!
//! Each submitted job runs on its own task and walks its contacts in order:
//! render, send, record, then wait a random delay before the next contact.
//! A failed contact is recorded and the batch moves on. Sends from all jobs
//! and the single-message endpoint share the session's one send path.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use wasender_core::config::{DispatchConfig, MediaConfig};
use wasender_core::error::{Result, SenderError};
use wasender_core::traits::MessagingSession;
use wasender_core::types::{
    Attachment, ChatAddress, Contact, DispatchJob, DispatchResult, JobId, JobReport, JobStatus,
    JobSummary, MessageTemplate, OutgoingMessage,
};

use crate::media::MediaResolver;
use crate::store::JobResultStore;
use crate::template::TemplateEngine;

/// Error recorded for contacts whose number has no digits.
pub const INVALID_NUMBER: &str = "invalid phone number";

/// Handle to a submitted job.
pub struct JobHandle {
    pub job_id: JobId,
    pub total: usize,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// Stop before the next contact. The in-flight send, if any, completes.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait until the job reaches a terminal state.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Job {} task failed: {e}", self.job_id);
        }
    }
}

struct Inner {
    session: Arc<dyn MessagingSession>,
    store: JobResultStore,
    templates: TemplateEngine,
    media: MediaResolver,
    country_code: String,
    active: Mutex<HashMap<JobId, CancellationToken>>,
}

/// Runs bulk jobs against the shared session.
#[derive(Clone)]
pub struct BulkDispatchScheduler {
    inner: Arc<Inner>,
}

impl BulkDispatchScheduler {
    pub fn new(
        session: Arc<dyn MessagingSession>,
        dispatch: &DispatchConfig,
        media: &MediaConfig,
    ) -> Self {
        Self::with_templates(session, dispatch, media, TemplateEngine::with_defaults())
    }

    pub fn with_templates(
        session: Arc<dyn MessagingSession>,
        dispatch: &DispatchConfig,
        media: &MediaConfig,
        templates: TemplateEngine,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                session,
                store: JobResultStore::new(dispatch.max_retained_jobs),
                templates,
                media: MediaResolver::new(media),
                country_code: dispatch.country_code.clone(),
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Validate and start a job. Returns as soon as the job is registered;
    /// sends happen in the background.
    pub async fn submit(&self, job: DispatchJob) -> Result<JobHandle> {
        job.validate()?;

        let snapshot = self.inner.session.snapshot();
        if !snapshot.is_ready() {
            return Err(SenderError::SessionNotReady(format!("session is {}", snapshot.state)));
        }

        let job_id = JobId::new();
        let total = job.contacts.len();
        let cancel = CancellationToken::new();

        self.inner.store.create(job_id, total).await;
        self.inner.active.lock().await.insert(job_id, cancel.clone());

        tracing::info!(
            "Job {job_id} queued: {total} contact(s), delay {}-{}ms{}",
            job.min_delay_ms,
            job.max_delay_ms,
            if job.media_url.is_some() { ", with media" } else { "" }
        );

        let task = tokio::spawn(self.inner.clone().run(job_id, job, cancel.clone()));
        Ok(JobHandle { job_id, total, cancel, task })
    }

    pub async fn report(&self, job_id: JobId) -> Option<JobReport> {
        self.inner.store.get(job_id).await
    }

    pub async fn list(&self) -> Vec<JobSummary> {
        self.inner.store.list().await
    }

    /// Request cancellation. `Ok(false)` if the job already finished.
    pub async fn cancel(&self, job_id: JobId) -> Result<bool> {
        if let Some(token) = self.inner.active.lock().await.get(&job_id) {
            tracing::warn!("Job {job_id}: cancellation requested");
            token.cancel();
            return Ok(true);
        }
        match self.inner.store.get(job_id).await {
            Some(_) => Ok(false),
            None => Err(SenderError::JobNotFound(job_id.to_string())),
        }
    }

    /// Cancel every running job; returns how many were signalled.
    pub async fn cancel_all(&self) -> usize {
        let active = self.inner.active.lock().await;
        for token in active.values() {
            token.cancel();
        }
        active.len()
    }

    pub async fn active_jobs(&self) -> usize {
        self.inner.active.lock().await.len()
    }
}

impl Inner {
    async fn run(self: Arc<Self>, job_id: JobId, job: DispatchJob, cancel: CancellationToken) {
        let total = job.contacts.len();
        self.record(job_id, self.store.set_status(job_id, JobStatus::Running).await);

        let attachment = match job.media_url.as_deref() {
            Some(url) => tokio::select! {
                _ = cancel.cancelled() => None,
                resolved = self.media.resolve(url) => resolved,
            },
            None => None,
        };
        self.record(job_id, self.store.set_media_attached(job_id, attachment.is_some()).await);

        let templates = job.templates();
        let mut cancelled = false;

        for (index, contact) in job.contacts.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let result = self.dispatch_one(contact, &templates, attachment.as_ref()).await;
            self.record(job_id, self.store.append(job_id, result).await);

            if index + 1 < total {
                let delay = pick_delay(job.min_delay_ms, job.max_delay_ms);
                tracing::debug!("Job {job_id}: {}/{total} done, next in {}ms", index + 1, delay.as_millis());
                tokio::select! {
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        // Leave the active map before the terminal status is written, so a
        // cancel either lands here or sees a finished job.
        self.active.lock().await.remove(&job_id);
        let status = if cancelled || cancel.is_cancelled() {
            JobStatus::Cancelled
        } else {
            JobStatus::Completed
        };
        self.record(job_id, self.store.set_status(job_id, status).await);

        if let Some(report) = self.store.get(job_id).await {
            tracing::info!(
                "Job {job_id} {:?}: {} sent, {} failed, {} skipped",
                status,
                report.sent,
                report.failed,
                report.pending()
            );
        }
    }

    async fn dispatch_one(
        &self,
        contact: &Contact,
        templates: &[&MessageTemplate],
        attachment: Option<&Attachment>,
    ) -> DispatchResult {
        let Some(to) = ChatAddress::for_contact(contact, &self.country_code) else {
            tracing::warn!("Skipping contact '{}': no digits in number", contact.name);
            return DispatchResult::failed(contact, INVALID_NUMBER);
        };

        let body = self.templates.render(pick_template(templates).as_str(), contact);
        let message = OutgoingMessage::text(to, body).with_attachment(attachment.cloned());

        match self.session.send(message).await {
            Ok(receipt) => DispatchResult::sent(contact, receipt.message_id),
            Err(e) => {
                tracing::warn!("Send to {} failed: {e}", contact.number);
                DispatchResult::failed(contact, e.to_string())
            }
        }
    }

    fn record(&self, job_id: JobId, outcome: Result<()>) {
        if let Err(e) = outcome {
            tracing::error!("Job {job_id}: result store update failed: {e}");
        }
    }
}

/// Uniform delay in `[min_ms, max_ms]`.
fn pick_delay(min_ms: u64, max_ms: u64) -> Duration {
    let ms = if min_ms >= max_ms {
        min_ms
    } else {
        rand::thread_rng().gen_range(min_ms..=max_ms)
    };
    Duration::from_millis(ms)
}

fn pick_template<'a>(templates: &[&'a MessageTemplate]) -> &'a MessageTemplate {
    match templates {
        [single] => single,
        _ => templates.choose(&mut rand::thread_rng()).copied().unwrap_or(templates[0]),
    }
}
