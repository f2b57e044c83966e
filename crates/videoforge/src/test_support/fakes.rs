//! Deterministic stand-ins for the external tools, shared by the unit
//! tests and the integration tests under `tests/`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::models::{ClipQuery, MediaClip, VoiceProfile, VoiceSettings};
use crate::tools::{
    MediaDownloader, MediaSearch, MuxRequest, MuxedVideo, Prompt, SpeechSynthesizer,
    SynthesizedAudio, TextGenerator, ToolError, Toolset, VideoMuxer,
};

/// A generator answer that parses as both a narrative and a script.
pub const SCRIPT_JSON: &str = r#"{"title": "Reefs in Peril", "sections": [
    {"type": "hook", "content": "Coral reefs are losing their color."},
    {"type": "main_content", "content": "Warm seas push coral to expel the algae that feed it, and whole reefs turn white."},
    {"type": "outro", "content": "Cooler water lets reefs recover."}
]}"#;

pub fn clip(id: &str, duration: f64, tags: &[&str]) -> MediaClip {
    MediaClip {
        id: id.to_string(),
        title: id.to_string(),
        thumbnail_ref: None,
        duration,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        source: "pexels".to_string(),
        license: "Pexels License".to_string(),
        remote_url: format!("https://cdn.example.com/{}.mp4", id),
        asset_ref: None,
    }
}

pub struct FakeGenerator {
    response: String,
}

impl FakeGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, ToolError> {
        Ok(self.response.clone())
    }
}

/// Returns the same clips for every query, or a fixed HTTP status.
pub struct FakeSearch {
    clips: Vec<MediaClip>,
    status: Option<u16>,
    calls: AtomicUsize,
}

impl FakeSearch {
    pub fn empty() -> Self {
        Self::with(Vec::new())
    }

    pub fn with(clips: Vec<MediaClip>) -> Self {
        Self {
            clips,
            status: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::empty()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSearch for FakeSearch {
    async fn search(&self, _query: &ClipQuery) -> Result<Vec<MediaClip>, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.status {
            Some(status) => Err(ToolError::Status {
                tool: "media search",
                status,
            }),
            None => Ok(self.clips.clone()),
        }
    }
}

pub struct FakeSynthesizer {
    duration: Option<f64>,
}

impl FakeSynthesizer {
    pub fn with_duration(duration: f64) -> Self {
        Self {
            duration: Some(duration),
        }
    }

    pub fn failing() -> Self {
        Self { duration: None }
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn list_voices(&self) -> Result<Vec<VoiceProfile>, ToolError> {
        Ok(Vec::new())
    }

    async fn synthesize(
        &self,
        _text: &str,
        _voice_id: &str,
        _settings: &VoiceSettings,
        output: &Path,
    ) -> Result<SynthesizedAudio, ToolError> {
        let Some(duration) = self.duration else {
            return Err(ToolError::Status {
                tool: "speech synthesis",
                status: 503,
            });
        };
        tokio::fs::write(output, b"ID3")
            .await
            .map_err(|e| ToolError::io(output, e))?;
        Ok(SynthesizedAudio {
            path: output.to_path_buf(),
            duration,
        })
    }
}

pub struct FakeDownloader;

#[async_trait]
impl MediaDownloader for FakeDownloader {
    async fn download(&self, clip: &MediaClip, dest_dir: &Path) -> Result<PathBuf, ToolError> {
        let path = dest_dir.join(format!("{}.mp4", clip.id));
        tokio::fs::write(&path, b"clip")
            .await
            .map_err(|e| ToolError::io(&path, e))?;
        Ok(path)
    }
}

/// Records every request. Writes the output file unless built with
/// [`FakeMuxer::failing`], which exits like a crashed ffmpeg.
#[derive(Default)]
pub struct FakeMuxer {
    pub requests: Mutex<Vec<MuxRequest>>,
    fail: bool,
}

impl FakeMuxer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl VideoMuxer for FakeMuxer {
    async fn assemble(&self, request: &MuxRequest) -> Result<MuxedVideo, ToolError> {
        self.requests
            .lock()
            .map_err(|_| ToolError::process("ffmpeg", "lock poisoned"))?
            .push(request.clone());
        if self.fail {
            return Err(ToolError::process(
                "ffmpeg",
                format!(
                    "exit status 1: Conversion failed writing {}",
                    request.output.display()
                ),
            ));
        }
        tokio::fs::write(&request.output, b"video")
            .await
            .map_err(|e| ToolError::io(&request.output, e))?;
        Ok(MuxedVideo {
            path: request.output.clone(),
            file_size: 5,
            resolution: "1280x720".to_string(),
        })
    }
}

/// Tools answering every generation call with `generated`, returning no
/// clips and synthesizing 100 seconds of audio.
pub fn toolset(generated: &str) -> Toolset {
    Toolset {
        generator: Arc::new(FakeGenerator::new(generated)),
        search: Arc::new(FakeSearch::empty()),
        synthesizer: Arc::new(FakeSynthesizer::with_duration(100.0)),
        downloader: Arc::new(FakeDownloader),
        muxer: Arc::new(FakeMuxer::default()),
    }
}
