//! Script generation and parsing of the generator's answer.
//!
//! The generator is asked for JSON but answers are accepted in three JSON
//! shapes (bare, fenced, embedded) and in the older `##MARKER##` layout:
//!
//! ```text
//! ##HOOK##
//! Ever wondered what lives below the waves?
//! ##DURATION##
//! 10 seconds
//! ##B_ROLL##
//! - waves crashing
//! ##OUTRO##
//! ...
//! ```

use std::sync::{Arc, LazyLock};

use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::jobs::JobStage;
use crate::models::{GeneratedStory, ScriptOptions, Section, SectionKind, Story};
use crate::pipeline::StageError;
use crate::tools::{Prompt, TextGenerator};

const SYSTEM_PROMPT: &str = "You are a script architect for narrated short videos. \
You split narration into sections a video editor can illustrate.";

/// The parsed result before it is stored as a script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptDraft {
    pub title: String,
    pub sections: Vec<Section>,
}

pub struct ScriptArchitect {
    generator: Arc<dyn TextGenerator>,
}

impl ScriptArchitect {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn draft(
        &self,
        story: &Story,
        narrative: Option<&GeneratedStory>,
        options: &ScriptOptions,
    ) -> Result<ScriptDraft, StageError> {
        let raw = self
            .generator
            .generate(&prompt_for(story, narrative, options))
            .await
            .map_err(|e| StageError::tool(JobStage::Script, e))?;

        let mut draft = parse_script(&raw, &story.topic)?;
        if !options.include_visual_suggestions {
            for section in &mut draft.sections {
                section.visual_suggestions.clear();
            }
        }
        Ok(draft)
    }
}

pub fn prompt_for(
    story: &Story,
    narrative: Option<&GeneratedStory>,
    options: &ScriptOptions,
) -> Prompt {
    let mut user = format!(
        "Write a {} video script about \"{}\" ({}) for {}. Tone: {}.\n",
        options.style.as_str(),
        story.topic,
        story.genre,
        story.target_audience,
        story.tone
    );
    if let Some(minutes) = options.target_duration_minutes {
        user.push_str(&format!("Target length: about {} minutes of narration.\n", minutes));
    }
    if let Some(ref details) = story.additional_details {
        user.push_str(&format!("Additional details: {}\n", details));
    }
    if let Some(narrative) = narrative {
        user.push_str("\nBase the script on this story:\n");
        user.push_str(&narrative.content);
        user.push('\n');
    }

    user.push_str(
        "\nAnswer with JSON only: {\"title\": string, \"sections\": [{\"type\": \
         \"hook\" | \"intro\" | \"main_content\" | \"outro\" | \"call_to_action\", \
         \"content\": string, \"duration\": seconds",
    );
    if options.include_visual_suggestions {
        user.push_str(", \"visual_suggestions\": [string]");
    }
    user.push_str("}]}. Start with a hook and end with an outro.");

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

#[derive(Deserialize)]
struct JsonScript {
    #[serde(default)]
    title: Option<String>,
    sections: Vec<JsonSection>,
}

#[derive(Deserialize)]
struct JsonSection {
    #[serde(rename = "type")]
    kind: String,
    content: String,
    #[serde(default, alias = "suggested_duration")]
    duration: Option<f64>,
    #[serde(default)]
    visual_suggestions: Vec<String>,
}

/// Parses a generator answer into a draft with at least a hook and an
/// outro. `fallback_title` is used when the answer carries none.
pub fn parse_script(raw: &str, fallback_title: &str) -> Result<ScriptDraft, StageError> {
    let (title, sections) = match parse_json(raw) {
        Some(parsed) => parsed,
        None => {
            debug!("Script answer is not JSON, trying section markers");
            parse_markers(raw)
        }
    };

    let sections: Vec<Section> = sections
        .into_iter()
        .filter(|s| !s.content.trim().is_empty())
        .collect();

    if sections.is_empty() {
        return Err(StageError::GenerationFormat(
            "no script sections found".to_string(),
        ));
    }
    let has = |kind: SectionKind| sections.iter().any(|s| s.kind == kind);
    if !has(SectionKind::Hook) || !has(SectionKind::Outro) {
        return Err(StageError::GenerationFormat(
            "script must contain a hook and an outro".to_string(),
        ));
    }

    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback_title.to_string());

    Ok(ScriptDraft { title, sections })
}

fn parse_json(raw: &str) -> Option<(Option<String>, Vec<Section>)> {
    let candidates = [Some(raw.trim()), fenced_block(raw), extract_json(raw)];
    let parsed = candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| serde_json::from_str::<JsonScript>(candidate).ok())?;

    let sections = parsed
        .sections
        .into_iter()
        .map(|s| Section {
            kind: SectionKind::parse(&s.kind).unwrap_or(SectionKind::MainContent),
            content: s.content.trim().to_string(),
            suggested_duration: s.duration.filter(|d| d.is_finite() && *d > 0.0),
            visual_suggestions: s.visual_suggestions,
        })
        .collect();
    Some((parsed.title, sections))
}

/// Body of the first fenced code block.
fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_fence = &raw[open + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

/// First balanced `{...}` object, skipping braces inside strings.
fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in raw[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Clone, Copy)]
enum Block {
    Title,
    Content,
    Duration,
    BRoll,
    Skip,
}

fn parse_markers(raw: &str) -> (Option<String>, Vec<Section>) {
    let mut title: Option<String> = None;
    let mut sections: Vec<Section> = Vec::new();
    let mut block = Block::Skip;

    for line in raw.lines() {
        let trimmed = line.trim();

        if let Some(marker) = marker_name(trimmed) {
            let upper = marker.to_ascii_uppercase().replace(['_', '-'], " ");
            block = match upper.as_str() {
                "TITLE" => Block::Title,
                "DURATION" if !sections.is_empty() => Block::Duration,
                "B ROLL" | "BROLL" | "VISUALS" if !sections.is_empty() => Block::BRoll,
                _ => match SectionKind::parse(marker) {
                    Some(kind) => {
                        sections.push(Section::new(kind, String::new()));
                        Block::Content
                    }
                    None => Block::Skip,
                },
            };
            continue;
        }

        if trimmed.is_empty() {
            if let (Block::Content, Some(section)) = (&block, sections.last_mut()) {
                if !section.content.is_empty() {
                    section.content.push('\n');
                }
            }
            continue;
        }

        match block {
            Block::Title => {
                if title.is_none() {
                    title = Some(trimmed.to_string());
                }
            }
            Block::Content => {
                if let Some(section) = sections.last_mut() {
                    if !section.content.is_empty() && !section.content.ends_with('\n') {
                        section.content.push(' ');
                    }
                    section.content.push_str(trimmed);
                }
            }
            Block::Duration => {
                if let Some(section) = sections.last_mut() {
                    section.suggested_duration = parse_duration(trimmed);
                }
                block = Block::Content;
            }
            Block::BRoll => {
                let bullet = trimmed.trim_start_matches(['-', '*', '•']).trim();
                if bullet.len() < trimmed.len() && !bullet.is_empty() {
                    if let Some(section) = sections.last_mut() {
                        section.visual_suggestions.push(bullet.to_string());
                    }
                }
            }
            Block::Skip => {}
        }
    }

    for section in &mut sections {
        section.content = section.content.trim().to_string();
    }
    (title, sections)
}

fn marker_name(line: &str) -> Option<&str> {
    let inner = line.strip_prefix("##")?.strip_suffix("##")?.trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());

/// Reads `15 seconds`, `30s`, `1.5 minutes` or `0:45` as seconds.
fn parse_duration(text: &str) -> Option<f64> {
    let text = text.trim().to_ascii_lowercase();

    let seconds = if let Some((minutes, seconds)) = text.split_once(':') {
        let minutes: f64 = minutes.trim().parse().ok()?;
        let seconds: f64 = seconds.trim().parse().ok()?;
        minutes * 60.0 + seconds
    } else {
        let value: f64 = NUMBER_RE.captures(&text)?.get(1)?.as_str().parse().ok()?;
        if text.contains("min") {
            value * 60.0
        } else {
            value
        }
    };

    (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}
