//! Contracts for the external collaborators a pipeline stage calls, and
//! the concrete adapters used in production.
//!
//! Every trait method is a suspension point; nothing else in a stage
//! blocks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::VideoForgeConfig;
use crate::error::ConfigError;
use crate::models::{ClipQuery, MediaClip, VoiceProfile, VoiceSettings};

pub mod cache;
pub mod download;
pub mod elevenlabs;
pub mod error;
pub mod ffmpeg;
pub mod openai;
pub mod pexels;

pub use error::ToolError;

/// Longest response body excerpt written to debug logs.
pub(crate) const MAX_ERROR_BODY_LENGTH: usize = 200;

/// A request to the text generation tool.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ToolError>;
}

#[async_trait]
pub trait MediaSearch: Send + Sync {
    /// Ranked candidates, best first. May legitimately be empty.
    async fn search(&self, query: &ClipQuery) -> Result<Vec<MediaClip>, ToolError>;
}

/// Output of a synthesis call. `duration` is authoritative for timing.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub path: PathBuf,
    pub duration: f64,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn list_voices(&self) -> Result<Vec<VoiceProfile>, ToolError>;

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
        output: &Path,
    ) -> Result<SynthesizedAudio, ToolError>;
}

#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Fetches the clip into `dest_dir` and returns the local file.
    async fn download(&self, clip: &MediaClip, dest_dir: &Path) -> Result<PathBuf, ToolError>;
}

/// One clip placed on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipWindow {
    pub path: PathBuf,
    pub clip_duration: f64,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MuxRequest {
    pub audio: PathBuf,
    pub windows: Vec<ClipWindow>,
    pub total_duration: f64,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MuxedVideo {
    pub path: PathBuf,
    pub file_size: u64,
    pub resolution: String,
}

#[async_trait]
pub trait VideoMuxer: Send + Sync {
    async fn assemble(&self, request: &MuxRequest) -> Result<MuxedVideo, ToolError>;
}

/// The collaborators one pipeline needs.
#[derive(Clone)]
pub struct Toolset {
    pub generator: Arc<dyn TextGenerator>,
    pub search: Arc<dyn MediaSearch>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub downloader: Arc<dyn MediaDownloader>,
    pub muxer: Arc<dyn VideoMuxer>,
}

impl Toolset {
    /// Builds the production adapters. API keys are resolved here, so a
    /// missing key fails at startup rather than inside a job.
    pub fn from_config(config: &VideoForgeConfig) -> Result<Self, ConfigError> {
        let client = http_client(Duration::from_secs(config.generation.timeout_secs))
            .map_err(|e| ConfigError::Validation {
                message: e.to_string(),
            })?;

        let generator = openai::OpenAiGenerator::new(client.clone(), &config.generation)?;
        let pexels = pexels::PexelsSearch::new(client.clone(), &config.search)?;
        let search = cache::CachedSearch::new(
            Arc::new(pexels),
            Duration::from_secs(config.research.cache_ttl_secs),
        );
        let synthesizer = elevenlabs::ElevenLabsSynthesizer::new(
            client.clone(),
            &config.synthesis,
            config.muxing.ffprobe.clone(),
        )?;
        let downloader = download::HttpDownloader::new(client);
        let muxer = ffmpeg::FfmpegMuxer::new(&config.muxing);

        Ok(Self {
            generator: Arc::new(generator),
            search: Arc::new(search),
            synthesizer: Arc::new(synthesizer),
            downloader: Arc::new(downloader),
            muxer: Arc::new(muxer),
        })
    }
}

/// Default connect timeout for tool HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates an HTTP client with connect and overall request timeouts.
pub fn http_client(request_timeout: Duration) -> Result<Client, ToolError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| ToolError::request("http", format!("failed to create HTTP client: {}", e)))
}

/// Turns a non-success response into [`ToolError::Status`], logging a
/// truncated body for diagnosis.
pub(crate) async fn check_status(
    tool: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ToolError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    log::debug!(
        "{} error body: {}",
        tool,
        crate::sanitize::truncate(&body, MAX_ERROR_BODY_LENGTH)
    );
    Err(ToolError::Status {
        tool,
        status: status.as_u16(),
    })
}
