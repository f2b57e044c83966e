use std::sync::Arc;

use crate::jobs::JobStage;
use crate::models::Story;
use crate::pipeline::StageError;
use crate::tools::{Prompt, TextGenerator};

const SYSTEM_PROMPT: &str = "You are a story writer for short narrated videos. \
Write vivid, factual prose that a narrator can read aloud. No headings, no lists.";

/// Turns a story request into narrative prose.
pub struct StoryWriter {
    generator: Arc<dyn TextGenerator>,
}

impl StoryWriter {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn write(&self, story: &Story) -> Result<String, StageError> {
        let raw = self
            .generator
            .generate(&prompt_for(story))
            .await
            .map_err(|e| StageError::tool(JobStage::Story, e))?;

        let content = raw.trim();
        if content.is_empty() {
            return Err(StageError::GenerationFormat(
                "story generation returned no text".to_string(),
            ));
        }
        Ok(content.to_string())
    }
}

pub fn prompt_for(story: &Story) -> Prompt {
    let mut user = format!(
        "Write a story about \"{}\".\nGenre: {}\nTarget audience: {}\nTone: {}\n",
        story.topic, story.genre, story.target_audience, story.tone
    );
    if let Some(ref details) = story.additional_details {
        user.push_str(&format!("Additional details: {}\n", details));
    }
    if !story.research_keywords.is_empty() {
        user.push_str(&format!(
            "Work in these themes: {}\n",
            story.research_keywords.join(", ")
        ));
    }

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
