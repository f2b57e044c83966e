use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

/// The user's request: what the video should be about.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub id: String,
    /// Opaque identity partition key supplied by the caller.
    pub owner_id: String,
    pub topic: String,
    pub genre: String,
    pub target_audience: String,
    pub tone: String,
    pub additional_details: Option<String>,
    #[serde(default)]
    pub research_keywords: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewStory {
    pub owner_id: String,
    pub topic: String,
    pub genre: String,
    pub target_audience: String,
    pub tone: String,
    #[serde(default)]
    pub additional_details: Option<String>,
    #[serde(default)]
    pub research_keywords: Vec<String>,
}

impl NewStory {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let required = [
            ("owner_id", &self.owner_id),
            ("topic", &self.topic),
            ("genre", &self.genre),
            ("target_audience", &self.target_audience),
            ("tone", &self.tone),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ArtifactError::InvalidInput(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }

    pub fn into_story(self, id: String, created_at: DateTime<Utc>) -> Story {
        let additional_details = self
            .additional_details
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        let research_keywords = self
            .research_keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        Story {
            id,
            owner_id: self.owner_id,
            topic: self.topic.trim().to_string(),
            genre: self.genre.trim().to_string(),
            target_audience: self.target_audience.trim().to_string(),
            tone: self.tone.trim().to_string(),
            additional_details,
            research_keywords,
            created_at,
        }
    }
}

/// Narrative text produced by the STORY stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedStory {
    pub id: String,
    pub story_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
