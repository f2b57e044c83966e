use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ArtifactError;

/// Role of a section within the narration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Hook,
    Intro,
    MainContent,
    Outro,
    CallToAction,
    /// Unstructured narration kept whole when no markers were found.
    FullScript,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Hook => "hook",
            SectionKind::Intro => "intro",
            SectionKind::MainContent => "main_content",
            SectionKind::Outro => "outro",
            SectionKind::CallToAction => "call_to_action",
            SectionKind::FullScript => "full_script",
        }
    }

    /// Parses a section type as written by the generation tool, either a
    /// serialized name (`main_content`) or a marker (`MAIN POINT 1`).
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase().replace(['_', '-'], " ");
        let normalized = normalized.trim();
        match normalized {
            "HOOK" | "OPENING HOOK" => Some(SectionKind::Hook),
            "INTRO" | "INTRODUCTION" => Some(SectionKind::Intro),
            "OUTRO" | "CONCLUSION" | "CLOSING" => Some(SectionKind::Outro),
            "CTA" | "CALL TO ACTION" => Some(SectionKind::CallToAction),
            "FULL SCRIPT" => Some(SectionKind::FullScript),
            "BODY" => Some(SectionKind::MainContent),
            other if other.starts_with("MAIN") || other.starts_with("SEGMENT") => {
                Some(SectionKind::MainContent)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub content: String,
    /// Seconds suggested by the writer; advisory only.
    #[serde(default)]
    pub suggested_duration: Option<f64>,
    #[serde(default)]
    pub visual_suggestions: Vec<String>,
}

impl Section {
    pub fn new(kind: SectionKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            suggested_duration: None,
            visual_suggestions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStyle {
    #[default]
    Professional,
    Conversational,
    Dramatic,
}

impl ScriptStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptStyle::Professional => "professional",
            ScriptStyle::Conversational => "conversational",
            ScriptStyle::Dramatic => "dramatic",
        }
    }
}

/// Options carried by a SCRIPT job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptOptions {
    #[serde(default)]
    pub style: ScriptStyle,
    #[serde(default = "default_true")]
    pub include_visual_suggestions: bool,
    #[serde(default)]
    pub target_duration_minutes: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            style: ScriptStyle::default(),
            include_visual_suggestions: true,
            target_duration_minutes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Script {
    pub id: String,
    pub story_id: String,
    pub title: String,
    pub sections: Vec<Section>,
    pub options: ScriptOptions,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// A caller edit. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptUpdate {
    pub title: Option<String>,
    pub sections: Option<Vec<Section>>,
    pub approved: Option<bool>,
}

impl Script {
    /// Applies an edit. Replacing sections of an approved script is
    /// refused unless the same edit withdraws the approval.
    pub fn apply_update(
        &mut self,
        update: ScriptUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), ArtifactError> {
        let approved_after = update.approved.unwrap_or(self.approved);

        if let Some(ref sections) = update.sections {
            if approved_after {
                return Err(ArtifactError::ScriptLocked(self.id.clone()));
            }
            if sections.is_empty() {
                return Err(ArtifactError::InvalidInput(
                    "a script needs at least one section".to_string(),
                ));
            }
        }

        if let Some(title) = update.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ArtifactError::InvalidInput("title must not be empty".to_string()));
            }
            self.title = title.to_string();
        }
        if let Some(sections) = update.sections {
            self.sections = sections;
        }
        self.approved = approved_after;
        self.modified_at = now;
        Ok(())
    }

    /// Full narration text, sections joined in order.
    pub fn narration(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
