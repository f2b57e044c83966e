//! Job tracker backed by the `generation_jobs` table.
//!
//! The tracker is stage-agnostic: it enforces the single-active-job rule
//! and the monotonic state machine, nothing about stage ordering.

use std::time::Duration;

use chrono::Utc;

use super::model::{GenerationJob, JobStage, JobStatus, StageRequest};
use crate::db::job_repo::{self, JobRow, Transition};
use crate::db::{self, Database, DatabaseError};
use crate::error::JobError;

// ─── Helpers ────────────────────────────────────────────────────────────────

fn row_to_job(row: JobRow) -> Result<GenerationJob, DatabaseError> {
    let stage = JobStage::parse(&row.stage).ok_or_else(|| DatabaseError::InvalidValue {
        column: "stage",
        value: row.stage.clone(),
    })?;
    let status = JobStatus::parse(&row.status).ok_or_else(|| DatabaseError::InvalidValue {
        column: "status",
        value: row.status.clone(),
    })?;
    let request: StageRequest = db::from_json("request", &row.request)?;
    let claimed_at = row
        .claimed_at
        .as_deref()
        .map(|s| db::parse_timestamp("claimed_at", s))
        .transpose()?;
    let completed_at = row
        .completed_at
        .as_deref()
        .map(|s| db::parse_timestamp("completed_at", s))
        .transpose()?;

    Ok(GenerationJob {
        created_at: db::parse_timestamp("created_at", &row.created_at)?,
        id: row.id,
        subject_id: row.subject_id,
        stage,
        status,
        request,
        message: row.message,
        artifact_ref: row.artifact_ref,
        claimed_at,
        completed_at,
    })
}

// ─── JobTracker ─────────────────────────────────────────────────────────────

/// Owns the lifecycle of every [`GenerationJob`].
#[derive(Clone)]
pub struct JobTracker {
    db: Database,
}

impl JobTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Creates a PENDING job for `subject_id`. The stage is taken from the
    /// request. Fails with [`JobError::Conflict`] while another job for the
    /// same subject and stage is pending or processing.
    pub fn submit(
        &self,
        subject_id: &str,
        request: StageRequest,
    ) -> Result<GenerationJob, JobError> {
        let stage = request.stage();
        let now = Utc::now();
        let row = JobRow {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            stage: stage.as_str().to_string(),
            status: JobStatus::Pending.as_str().to_string(),
            request: db::to_json("request", &request)?,
            message: Some("Queued".to_string()),
            artifact_ref: None,
            created_at: db::format_timestamp(&now),
            claimed_at: None,
            completed_at: None,
        };

        match job_repo::insert(&self.db, &row) {
            Ok(()) => {}
            Err(e) if e.is_constraint_violation() => {
                let active = job_repo::find_active(&self.db, subject_id, stage.as_str())?;
                return Err(JobError::Conflict {
                    subject_id: subject_id.to_string(),
                    stage,
                    job_id: active.map(|r| r.id).unwrap_or_default(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        log::info!(
            "Submitted {} job {} for subject {}",
            stage,
            row.id,
            subject_id
        );
        Ok(row_to_job(row)?)
    }

    /// PENDING -> PROCESSING. A second claim of the same job fails with
    /// [`JobError::InvalidState`], so only one worker ever runs it.
    pub fn claim(&self, job_id: &str) -> Result<GenerationJob, JobError> {
        let now = db::format_timestamp(&Utc::now());
        self.transition(
            job_id,
            JobStatus::Pending,
            JobStatus::Processing,
            Transition {
                message: Some("Processing"),
                claimed_at: Some(&now),
                ..Default::default()
            },
        )
    }

    /// PROCESSING -> COMPLETED, recording where the produced artifact lives.
    pub fn complete(&self, job_id: &str, artifact_ref: &str) -> Result<GenerationJob, JobError> {
        self.complete_with_message(job_id, artifact_ref, "Completed")
    }

    /// Like [`JobTracker::complete`] with a custom summary message.
    pub fn complete_with_message(
        &self,
        job_id: &str,
        artifact_ref: &str,
        message: &str,
    ) -> Result<GenerationJob, JobError> {
        let now = db::format_timestamp(&Utc::now());
        self.transition(
            job_id,
            JobStatus::Processing,
            JobStatus::Completed,
            Transition {
                message: Some(message),
                artifact_ref: Some(artifact_ref),
                completed_at: Some(&now),
                ..Default::default()
            },
        )
    }

    /// PROCESSING -> FAILED. Never retried; a retry is a fresh `submit`.
    pub fn fail(&self, job_id: &str, message: &str) -> Result<GenerationJob, JobError> {
        let now = db::format_timestamp(&Utc::now());
        self.transition(
            job_id,
            JobStatus::Processing,
            JobStatus::Failed,
            Transition {
                message: Some(message),
                completed_at: Some(&now),
                ..Default::default()
            },
        )
    }

    /// Operator disposition of a stalled job: PENDING -> FAILED. Frees the
    /// (subject, stage) slot for a replacement submission.
    pub fn force_fail(&self, job_id: &str, message: &str) -> Result<GenerationJob, JobError> {
        let now = db::format_timestamp(&Utc::now());
        let job = self.transition(
            job_id,
            JobStatus::Pending,
            JobStatus::Failed,
            Transition {
                message: Some(message),
                completed_at: Some(&now),
                ..Default::default()
            },
        )?;
        log::warn!("Job {} force-failed: {}", job_id, message);
        Ok(job)
    }

    pub fn get(&self, job_id: &str) -> Result<GenerationJob, JobError> {
        let row = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;
        Ok(row_to_job(row)?)
    }

    /// All jobs for a subject, most recent first.
    pub fn list(&self, subject_id: &str) -> Result<Vec<GenerationJob>, JobError> {
        let rows = job_repo::list_by_subject(&self.db, subject_id)?;
        let jobs = rows
            .into_iter()
            .map(row_to_job)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    /// Most recent job for a subject at one stage.
    pub fn latest(
        &self,
        subject_id: &str,
        stage: JobStage,
    ) -> Result<Option<GenerationJob>, JobError> {
        Ok(self.list(subject_id)?.into_iter().find(|j| j.stage == stage))
    }

    /// Pending jobs older than `threshold`, oldest first. The tracker
    /// reports them but never cancels them itself.
    pub fn stalled(&self, threshold: Duration) -> Result<Vec<GenerationJob>, JobError> {
        let threshold = chrono::Duration::from_std(threshold)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let cutoff = db::format_timestamp(&(Utc::now() - threshold));
        let rows = job_repo::list_by_status_before(&self.db, JobStatus::Pending.as_str(), &cutoff)?;
        let jobs = rows
            .into_iter()
            .map(row_to_job)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn transition(
        &self,
        job_id: &str,
        from: JobStatus,
        to: JobStatus,
        changes: Transition<'_>,
    ) -> Result<GenerationJob, JobError> {
        let moved = job_repo::transition(&self.db, job_id, from.as_str(), to.as_str(), &changes)?;
        let current = self.get(job_id)?;
        if !moved {
            return Err(JobError::InvalidState {
                job_id: job_id.to_string(),
                from: current.status,
                to,
            });
        }
        log::debug!("Job {} moved {} -> {}", job_id, from, to);
        Ok(current)
    }
}
