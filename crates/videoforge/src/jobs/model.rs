use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ScriptOptions, Segment, VoicePreferences};

/// Pipeline stage a job belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Story,
    Script,
    VoiceOver,
    Media,
    Video,
}

impl JobStage {
    pub const ALL: [JobStage; 5] = [
        JobStage::Story,
        JobStage::Script,
        JobStage::VoiceOver,
        JobStage::Media,
        JobStage::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Story => "story",
            JobStage::Script => "script",
            JobStage::VoiceOver => "voice_over",
            JobStage::Media => "media",
            JobStage::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        JobStage::ALL.into_iter().find(|stage| stage.as_str() == s)
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStage::Story => "Story",
            JobStage::Script => "Script",
            JobStage::VoiceOver => "Voice-over",
            JobStage::Media => "Media",
            JobStage::Video => "Video",
        };
        f.write_str(label)
    }
}

/// Canonical job states. Transitions only move forward:
/// `Pending -> Processing -> {Completed, Failed}`, plus the operator-forced
/// `Pending -> Failed` for stalled jobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Work description stored with each job so any worker can execute it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageRequest {
    Story,
    Script(ScriptOptions),
    VoiceOver(VoicePreferences),
    Media {
        voice_over_id: String,
    },
    Video {
        voice_over_id: String,
        segments: Vec<Segment>,
    },
}

impl StageRequest {
    pub fn stage(&self) -> JobStage {
        match self {
            StageRequest::Story => JobStage::Story,
            StageRequest::Script(_) => JobStage::Script,
            StageRequest::VoiceOver(_) => JobStage::VoiceOver,
            StageRequest::Media { .. } => JobStage::Media,
            StageRequest::Video { .. } => JobStage::Video,
        }
    }
}

/// One asynchronous attempt at producing a stage's artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationJob {
    pub id: String,
    pub subject_id: String,
    pub stage: JobStage,
    pub status: JobStatus,
    pub request: StageRequest,
    pub message: Option<String>,
    /// Id of the produced artifact, set on completion.
    pub artifact_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// A pending job older than `threshold` with no claim recorded.
    pub fn is_stalled(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        if self.status != JobStatus::Pending || self.claimed_at.is_some() {
            return false;
        }
        let age = now.signed_duration_since(self.created_at);
        age.to_std().map(|age| age > threshold).unwrap_or(false)
    }
}
