//! Speech synthesis through the ElevenLabs text-to-speech API.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{check_status, ffmpeg, SpeechSynthesizer, SynthesizedAudio, ToolError};
use crate::config::SynthesisConfig;
use crate::error::ConfigError;
use crate::models::{VoiceProfile, VoiceSettings};

const TOOL: &str = "speech synthesis";

pub struct ElevenLabsSynthesizer {
    client: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
    ffprobe: PathBuf,
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<ApiVoice>,
}

#[derive(Deserialize)]
struct ApiVoice {
    voice_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

impl ElevenLabsSynthesizer {
    pub fn new(
        client: Client,
        config: &SynthesisConfig,
        ffprobe: PathBuf,
    ) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .resolve()
            .map_err(|source| ConfigError::Credential { tool: TOOL, source })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            ffprobe,
        })
    }
}

fn parse_voices(body: &str) -> Result<Vec<VoiceProfile>, ToolError> {
    let response: VoicesResponse =
        serde_json::from_str(body).map_err(|e| ToolError::decode(TOOL, e))?;
    Ok(response
        .voices
        .into_iter()
        .map(|v| VoiceProfile {
            name: v.name.unwrap_or_else(|| v.voice_id.clone()),
            voice_id: v.voice_id,
            labels: v
                .labels
                .into_iter()
                .map(|(k, val)| (k.to_lowercase(), val.to_lowercase()))
                .collect(),
        })
        .collect())
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn list_voices(&self) -> Result<Vec<VoiceProfile>, ToolError> {
        let response = self
            .client
            .get(format!("{}/v1/voices", self.endpoint))
            .header("xi-api-key", self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| ToolError::request(TOOL, e.without_url()))?;
        let response = check_status(TOOL, response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::request(TOOL, e.without_url()))?;
        parse_voices(&body)
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
        output: &Path,
    ) -> Result<SynthesizedAudio, ToolError> {
        let request = SpeechRequest {
            text,
            model_id: &self.model,
            voice_settings: settings,
        };
        let response = self
            .client
            .post(format!("{}/v1/text-to-speech/{}", self.endpoint, voice_id))
            .header("xi-api-key", self.api_key.expose_secret())
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| ToolError::request(TOOL, e.without_url()))?;
        let response = check_status(TOOL, response).await?;
        let audio = response
            .bytes()
            .await
            .map_err(|e| ToolError::request(TOOL, e.without_url()))?;
        if audio.is_empty() {
            return Err(ToolError::decode(TOOL, "empty audio response"));
        }

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io(parent, e))?;
        }
        tokio::fs::write(output, &audio)
            .await
            .map_err(|e| ToolError::io(output, e))?;

        let duration = ffmpeg::probe_duration(&self.ffprobe, output).await?;
        Ok(SynthesizedAudio {
            path: output.to_path_buf(),
            duration,
        })
    }
}
