use crate::jobs::{GenerationJob, JobStage, JobStatus};

/// A submitted job handed to the pool. Workers reload the job from the
/// tracker when they claim it, so only its identity travels.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub job_id: String,
    pub subject_id: String,
    pub stage: JobStage,
}

impl From<&GenerationJob> for QueuedJob {
    fn from(job: &GenerationJob) -> Self {
        Self {
            job_id: job.id.clone(),
            subject_id: job.subject_id.clone(),
            stage: job.stage,
        }
    }
}

/// What a worker did with a queued job.
#[derive(Debug)]
pub enum JobOutcome {
    /// Ran to a terminal state.
    Finished(GenerationJob),
    /// The claim was refused: another worker took it, or it was
    /// force-failed while queued.
    NotClaimed { job_id: String, reason: String },
    /// The stage ran but its outcome could not be recorded.
    Untracked { job_id: String, error: String },
}

impl JobOutcome {
    pub fn job_id(&self) -> &str {
        match self {
            JobOutcome::Finished(job) => &job.id,
            JobOutcome::NotClaimed { job_id, .. } | JobOutcome::Untracked { job_id, .. } => job_id,
        }
    }

    pub fn status(&self) -> Option<JobStatus> {
        match self {
            JobOutcome::Finished(job) => Some(job.status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_job_id() {
        let outcome = JobOutcome::NotClaimed {
            job_id: "job-1".to_string(),
            reason: "already processing".to_string(),
        };
        assert_eq!(outcome.job_id(), "job-1");
        assert!(outcome.status().is_none());
    }
}
