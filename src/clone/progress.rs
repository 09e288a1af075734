// ABOUTME: Single-flight progress and cancellation state for clone jobs
// ABOUTME: Only the active job may move the percentage, and only forward

use rand::Rng;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::error::{ClonerError, Stage};

/// Milestones reported while a clone runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Milestone {
    Started,
    Dumping,
    Dumped,
    Restoring,
    Completed,
}

impl Milestone {
    pub fn percent(self) -> u8 {
        match self {
            Milestone::Started => 0,
            Milestone::Dumping => 25,
            Milestone::Dumped => 50,
            Milestone::Restoring => 75,
            Milestone::Completed => 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    fn generate() -> Self {
        JobId(format!("{:016x}", rand::thread_rng().gen::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct ActiveJob {
    id: JobId,
    cancel: CancellationToken,
}

#[derive(Default)]
struct TrackerState {
    percent: u8,
    active: Option<ActiveJob>,
}

/// Shared between the running job and callers polling or cancelling it.
#[derive(Default)]
pub struct ProgressTracker {
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the tracker for a new job; fails while another job holds it.
    pub fn begin(&self) -> Result<JobGuard<'_>, ClonerError> {
        let mut state = self.lock();
        if state.active.is_some() {
            return Err(ClonerError::CloneInProgress);
        }

        let id = JobId::generate();
        let cancel = CancellationToken::new();
        state.percent = Milestone::Started.percent();
        state.active = Some(ActiveJob {
            id: id.clone(),
            cancel: cancel.clone(),
        });

        Ok(JobGuard {
            tracker: self,
            id,
            cancel,
        })
    }

    pub fn percent(&self) -> u8 {
        self.lock().percent
    }

    #[cfg(test)]
    pub(crate) fn active_job(&self) -> Option<JobId> {
        self.lock().active.as_ref().map(|job| job.id.clone())
    }

    /// Zero the reported progress and signal the active job, if any.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.percent = 0;
        if let Some(job) = &state.active {
            tracing::info!(job_id = %job.id, "Cancelling clone job");
            job.cancel.cancel();
        }
    }
}

/// Held by the running job; releases the tracker on drop.
pub struct JobGuard<'a> {
    tracker: &'a ProgressTracker,
    id: JobId,
    cancel: CancellationToken,
}

impl JobGuard<'_> {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Ignored once cancelled, and never moves backwards.
    pub fn advance(&self, milestone: Milestone) {
        let mut state = self.tracker.lock();
        // Checked under the lock: cancel() flips the token while holding it.
        if self.cancel.is_cancelled() {
            return;
        }
        let percent = milestone.percent();
        if percent > state.percent {
            state.percent = percent;
            tracing::debug!(job_id = %self.id, percent, "Progress");
        }
    }

    /// Error out before starting `stage` if a cancel has arrived.
    pub fn checkpoint(&self, stage: Stage) -> Result<(), ClonerError> {
        if self.cancel.is_cancelled() {
            return Err(ClonerError::Cancelled(stage));
        }
        Ok(())
    }

    /// Report completion, unless a cancel arrived first; the check and the
    /// update happen under one lock so a late cancel never reads as success.
    pub fn finish(&self) -> Result<(), ClonerError> {
        let mut state = self.tracker.lock();
        if self.cancel.is_cancelled() {
            return Err(ClonerError::Cancelled(Stage::Cleanup));
        }
        state.percent = Milestone::Completed.percent();
        Ok(())
    }

    pub fn fail(&self) {
        self.tracker.lock().percent = 0;
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.tracker.lock();
        if state.active.as_ref().is_some_and(|job| job.id == self.id) {
            state.active = None;
        }
    }
}
