//! In-memory job results, readable while a job is still running.
//!
//! Results are append-only: one entry per contact, in dispatch order,
//! never rewritten. Finished jobs beyond the retention limit are evicted
//! oldest first; running jobs are never evicted.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use tokio::sync::RwLock;

use wasender_core::error::{Result, SenderError};
use wasender_core::types::{DispatchResult, JobId, JobReport, JobStatus, JobSummary};

#[derive(Default)]
struct Inner {
    reports: HashMap<JobId, JobReport>,
    /// Insertion order, oldest first.
    order: VecDeque<JobId>,
}

pub struct JobResultStore {
    inner: RwLock<Inner>,
    max_retained: usize,
}

impl JobResultStore {
    pub fn new(max_retained: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_retained: max_retained.max(1),
        }
    }

    /// Register a new job in `Queued` state.
    pub async fn create(&self, job_id: JobId, total: usize) {
        let mut inner = self.inner.write().await;
        inner.reports.insert(job_id, JobReport {
            job_id,
            status: JobStatus::Queued,
            total,
            sent: 0,
            failed: 0,
            media_attached: false,
            results: Vec::with_capacity(total),
            created_at: Utc::now(),
            finished_at: None,
        });
        inner.order.push_back(job_id);
        self.evict(&mut inner);
    }

    /// Append one contact's outcome.
    pub async fn append(&self, job_id: JobId, result: DispatchResult) -> Result<()> {
        let mut inner = self.inner.write().await;
        let report = inner.reports.get_mut(&job_id)
            .ok_or_else(|| SenderError::JobNotFound(job_id.to_string()))?;
        if report.results.len() >= report.total {
            return Err(SenderError::Other(format!("job {job_id} already has all results")));
        }
        if result.is_sent() {
            report.sent += 1;
        } else {
            report.failed += 1;
        }
        report.results.push(result);
        Ok(())
    }

    /// Move a job forward. Terminal states are final; later calls are ignored.
    pub async fn set_status(&self, job_id: JobId, status: JobStatus) -> Result<()> {
        let mut inner = self.inner.write().await;
        let report = inner.reports.get_mut(&job_id)
            .ok_or_else(|| SenderError::JobNotFound(job_id.to_string()))?;
        if report.status.is_terminal() {
            tracing::debug!("Job {job_id} already {:?}, ignoring {:?}", report.status, status);
            return Ok(());
        }
        report.status = status;
        if status.is_terminal() {
            report.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    pub async fn set_media_attached(&self, job_id: JobId, attached: bool) -> Result<()> {
        let mut inner = self.inner.write().await;
        let report = inner.reports.get_mut(&job_id)
            .ok_or_else(|| SenderError::JobNotFound(job_id.to_string()))?;
        report.media_attached = attached;
        Ok(())
    }

    /// Point-in-time copy of a job's report.
    pub async fn get(&self, job_id: JobId) -> Option<JobReport> {
        self.inner.read().await.reports.get(&job_id).cloned()
    }

    /// All retained jobs, newest first.
    pub async fn list(&self) -> Vec<JobSummary> {
        let inner = self.inner.read().await;
        inner.order.iter().rev()
            .filter_map(|id| inner.reports.get(id))
            .map(JobReport::summary)
            .collect()
    }

    pub async fn retained(&self) -> usize {
        self.inner.read().await.reports.len()
    }

    fn evict(&self, inner: &mut Inner) {
        while inner.reports.len() > self.max_retained {
            let Some(pos) = inner.order.iter().position(|id| {
                inner.reports.get(id).is_some_and(|r| r.status.is_terminal())
            }) else {
                break;
            };
            if let Some(id) = inner.order.remove(pos) {
                inner.reports.remove(&id);
                tracing::debug!("Evicted finished job {id}");
            }
        }
    }
}
