//! Test harness for isolated pipeline runs.
//!
//! Each harness owns a temp directory holding the data directory and a
//! file-backed database, so tests never share state.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::TempDir;

use videoforge::config::JobsConfig;
use videoforge::db::{script_repo, story_repo, voice_over_repo};
use videoforge::models::{
    Script, ScriptOptions, Section, SectionKind, Story, VoiceOver, VoiceSettings,
};
use videoforge::{Database, JobStatus, PipelineConfig, Toolset, VideoForge};

pub struct TestHarness {
    temp_dir: TempDir,
    /// Root of generated audio, clips and videos.
    pub data_dir: PathBuf,
    pub db: Database,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let data_dir = temp_dir.path().join("data");
        std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");
        let db = Database::open(&temp_dir.path().join("videoforge.db"))
            .expect("Failed to open database");

        Self {
            temp_dir,
            data_dir,
            db,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Jobs config with a short poll interval.
    pub fn jobs_config() -> JobsConfig {
        JobsConfig {
            poll_interval_ms: 10,
            ..Default::default()
        }
    }

    pub fn forge(&self, tools: Toolset) -> VideoForge {
        self.forge_with(tools, Self::jobs_config(), 2)
    }

    pub fn forge_with(&self, tools: Toolset, jobs: JobsConfig, workers: usize) -> VideoForge {
        VideoForge::new(
            self.db.clone(),
            tools,
            PipelineConfig::with_data_directory(&self.data_dir),
            jobs,
            workers,
        )
        .expect("Failed to build VideoForge")
    }

    pub fn seed_story(&self, id: &str) -> Story {
        let story = Story {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            topic: "Coral reefs".to_string(),
            genre: "documentary".to_string(),
            target_audience: "students".to_string(),
            tone: "hopeful".to_string(),
            additional_details: Some("Bleaching events and reef recovery".to_string()),
            research_keywords: vec!["coral".to_string()],
            created_at: Utc::now(),
        };
        story_repo::insert(&self.db, &story).expect("Failed to insert story");
        story
    }

    /// A script whose sections are 100, 300 and 100 characters long.
    pub fn seed_script(&self, id: &str, story_id: &str, approved: bool) -> Script {
        let now = Utc::now();
        let script = Script {
            id: id.to_string(),
            story_id: story_id.to_string(),
            title: "Reefs in Peril".to_string(),
            sections: vec![
                Section::new(SectionKind::Hook, "h".repeat(100)),
                Section::new(SectionKind::MainContent, "m".repeat(300)),
                Section::new(SectionKind::Outro, "o".repeat(100)),
            ],
            options: ScriptOptions::default(),
            approved,
            created_at: now,
            modified_at: now,
        };
        script_repo::insert(&self.db, &script).expect("Failed to insert script");
        script
    }

    /// A completed voice-over with an audio file in the data directory.
    pub fn seed_voice_over(&self, id: &str, script_id: &str, duration: f64) -> VoiceOver {
        let audio = self.data_dir.join(format!("{}.mp3", id));
        std::fs::write(&audio, b"ID3").expect("Failed to write audio");
        let voice_over = VoiceOver {
            id: id.to_string(),
            script_id: script_id.to_string(),
            voice_id: "voice-1".to_string(),
            settings: VoiceSettings::default(),
            status: JobStatus::Completed,
            audio_ref: Some(audio.display().to_string()),
            total_duration: Some(duration),
            created_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };
        voice_over_repo::insert(&self.db, &voice_over).expect("Failed to insert voice-over");
        voice_over
    }

    /// Story, approved three-section script and a 100-second voice-over.
    pub fn seed_chain(&self) -> (Story, Script, VoiceOver) {
        let story = self.seed_story("story-1");
        let script = self.seed_script("script-1", &story.id, true);
        let voice_over = self.seed_voice_over("vo-1", &script.id, 100.0);
        (story, script, voice_over)
    }
}
