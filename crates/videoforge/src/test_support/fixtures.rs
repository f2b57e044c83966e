//! Fixtures for unit tests.

use chrono::Utc;

use crate::db::{script_repo, story_repo, voice_over_repo, Database};
use crate::jobs::JobStatus;
use crate::models::{Script, ScriptOptions, Section, SectionKind, Story, VoiceOver, VoiceSettings};

pub fn story(id: &str) -> Story {
    Story {
        id: id.to_string(),
        owner_id: "user-1".to_string(),
        topic: "Coral reefs".to_string(),
        genre: "documentary".to_string(),
        target_audience: "students".to_string(),
        tone: "inspiring".to_string(),
        additional_details: Some("Explain bleaching and recovery efforts".to_string()),
        research_keywords: Vec::new(),
        created_at: Utc::now(),
    }
}

pub fn script(id: &str, story_id: &str, sections: Vec<Section>) -> Script {
    let now = Utc::now();
    Script {
        id: id.to_string(),
        story_id: story_id.to_string(),
        title: "Reefs in Peril".to_string(),
        sections,
        options: ScriptOptions::default(),
        approved: true,
        created_at: now,
        modified_at: now,
    }
}

pub fn three_sections() -> Vec<Section> {
    vec![
        Section::new(SectionKind::Hook, "x".repeat(100)),
        Section::new(SectionKind::MainContent, "y".repeat(300)),
        Section::new(SectionKind::Outro, "z".repeat(100)),
    ]
}

pub fn voice_over(id: &str, script_id: &str, duration: Option<f64>) -> VoiceOver {
    VoiceOver {
        id: id.to_string(),
        script_id: script_id.to_string(),
        voice_id: "voice-1".to_string(),
        settings: VoiceSettings::default(),
        status: if duration.is_some() {
            JobStatus::Completed
        } else {
            JobStatus::Processing
        },
        audio_ref: duration.map(|_| format!("/tmp/{}.mp3", id)),
        total_duration: duration,
        created_at: Utc::now(),
        completed_at: duration.map(|_| Utc::now()),
    }
}

/// Database with a story, an approved three-section script and a
/// completed 100-second voice-over: `story-1`, `script-1`, `vo-1`.
pub fn seeded_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    story_repo::insert(&db, &story("story-1")).unwrap();
    script_repo::insert(&db, &script("script-1", "story-1", three_sections())).unwrap();
    voice_over_repo::insert(&db, &voice_over("vo-1", "script-1", Some(100.0))).unwrap();
    db
}
