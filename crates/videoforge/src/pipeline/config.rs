use std::path::PathBuf;

use crate::config::{ResearchConfig, VideoForgeConfig};

/// The part of the application config a stage needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub audio_dir: PathBuf,
    pub clips_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub default_voice_id: String,
    pub research: ResearchConfig,
}

impl PipelineConfig {
    pub fn from_config(config: &VideoForgeConfig) -> Self {
        Self {
            audio_dir: config.audio_dir(),
            clips_dir: config.clips_dir(),
            videos_dir: config.videos_dir(),
            default_voice_id: config.synthesis.default_voice_id.clone(),
            research: config.research.clone(),
        }
    }

    /// Config rooted at `data_directory` with default research settings.
    pub fn with_data_directory(data_directory: impl Into<PathBuf>) -> Self {
        let data_directory = data_directory.into();
        Self {
            audio_dir: data_directory.join("audio"),
            clips_dir: data_directory.join("clips"),
            videos_dir: data_directory.join("videos"),
            default_voice_id: crate::config::SynthesisConfig::default().default_voice_id,
            research: ResearchConfig::default(),
        }
    }
}
