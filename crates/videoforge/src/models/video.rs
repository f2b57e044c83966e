use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::media::Segment;
use crate::jobs::JobStatus;

/// The assembled video. Only written once every segment had a clip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalVideo {
    pub id: String,
    pub story_id: String,
    pub script_id: String,
    pub voice_over_id: String,
    pub title: String,
    pub description: String,
    /// Ordered segment-clip bindings the video was cut from.
    pub segments: Vec<Segment>,
    pub duration: f64,
    pub resolution: String,
    pub file_size: u64,
    pub asset_ref: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinalVideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}
