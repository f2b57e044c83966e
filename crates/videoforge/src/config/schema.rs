use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::secrets::SecretSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoForgeConfig {
    pub version: String,
    /// Root for generated audio, downloaded clips and rendered videos.
    pub data_directory: PathBuf,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub muxing: MuxingConfig,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl VideoForgeConfig {
    /// Database location: the configured path, else the per-user default,
    /// else a file inside the data directory.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
            .unwrap_or_else(|| self.data_directory.join("videoforge.db"))
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.data_directory.join("audio")
    }

    pub fn clips_dir(&self) -> PathBuf {
        self.data_directory.join("clips")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.data_directory.join("videos")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// A PENDING job older than this is reported as stalled.
    #[serde(default = "default_stalled_after_secs")]
    pub stalled_after_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_stalled_after_secs() -> u64 {
    600
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            stalled_after_secs: default_stalled_after_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl JobsConfig {
    pub fn stalled_after(&self) -> Duration {
        Duration::from_secs(self.stalled_after_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Segments researched at once; keep within the search tool's rate limit.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_safe_licenses")]
    pub safe_licenses: Vec<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Keywords taken from a segment's text for its search query.
    #[serde(default = "default_keywords_per_segment")]
    pub keywords_per_segment: usize,
}

fn default_concurrency() -> usize {
    4
}

fn default_per_page() -> u32 {
    10
}

fn default_safe_licenses() -> Vec<String> {
    vec![
        "Pexels License".to_string(),
        "CC0".to_string(),
        "CC-BY".to_string(),
    ]
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_keywords_per_segment() -> usize {
    3
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            per_page: default_per_page(),
            safe_licenses: default_safe_licenses(),
            cache_ttl_secs: default_cache_ttl_secs(),
            keywords_per_segment: default_keywords_per_segment(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_generation_key")]
    pub api_key: SecretSource,
}

fn default_generation_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_generation_key() -> SecretSource {
    SecretSource::from_env_var("OPENAI_API_KEY")
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            api_key: default_generation_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_key")]
    pub api_key: SecretSource,
}

fn default_search_endpoint() -> String {
    "https://api.pexels.com".to_string()
}

fn default_search_key() -> SecretSource {
    SecretSource::from_env_var("PEXELS_API_KEY")
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key: default_search_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_synthesis_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_synthesis_model")]
    pub model: String,
    /// Used when no catalog voice matches the caller's preferences.
    #[serde(default = "default_voice_id")]
    pub default_voice_id: String,
    #[serde(default = "default_synthesis_key")]
    pub api_key: SecretSource,
}

fn default_synthesis_endpoint() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_synthesis_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_synthesis_key() -> SecretSource {
    SecretSource::from_env_var("ELEVENLABS_API_KEY")
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_synthesis_endpoint(),
            model: default_synthesis_model(),
            default_voice_id: default_voice_id(),
            api_key: default_synthesis_key(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxingConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_fps() -> u32 {
    30
}

impl Default for MuxingConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}
