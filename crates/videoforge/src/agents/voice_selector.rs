use std::sync::Arc;

use log::info;

use crate::jobs::JobStage;
use crate::models::{VoicePreferences, VoiceProfile};
use crate::pipeline::StageError;
use crate::tools::SpeechSynthesizer;

/// Picks the voice a script is read with.
pub struct VoiceSelector {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    default_voice_id: String,
}

impl VoiceSelector {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, default_voice_id: impl Into<String>) -> Self {
        Self {
            synthesizer,
            default_voice_id: default_voice_id.into(),
        }
    }

    /// Resolves preferences to a voice id. The catalog is only fetched when
    /// no explicit id was given.
    pub async fn select(&self, preferences: &VoicePreferences) -> Result<String, StageError> {
        if let Some(voice_id) = explicit_voice(preferences) {
            return Ok(voice_id.to_string());
        }
        if preferences.gender.is_none() && preferences.tone.is_none() {
            return Ok(self.default_voice_id.clone());
        }

        let catalog = self
            .synthesizer
            .list_voices()
            .await
            .map_err(|e| StageError::tool(JobStage::VoiceOver, e))?;
        let voice_id = choose_voice(preferences, &catalog, &self.default_voice_id);
        info!("Selected voice {} from {} candidates", voice_id, catalog.len());
        Ok(voice_id)
    }
}

fn explicit_voice(preferences: &VoicePreferences) -> Option<&str> {
    preferences
        .voice_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Explicit id, else the first voice matching gender and tone, else the
/// first matching gender, else `default_voice_id`.
pub fn choose_voice(
    preferences: &VoicePreferences,
    catalog: &[VoiceProfile],
    default_voice_id: &str,
) -> String {
    if let Some(voice_id) = explicit_voice(preferences) {
        return voice_id.to_string();
    }

    let matches = |profile: &VoiceProfile, key: &str, wanted: &Option<String>| match wanted {
        Some(wanted) => profile
            .label(key)
            .is_some_and(|value| value.eq_ignore_ascii_case(wanted.trim())),
        None => true,
    };

    let by_gender_and_tone = catalog.iter().find(|p| {
        matches(p, "gender", &preferences.gender) && matches(p, "tone", &preferences.tone)
    });
    let by_gender = || {
        preferences
            .gender
            .as_ref()
            .and_then(|_| catalog.iter().find(|p| matches(p, "gender", &preferences.gender)))
    };

    by_gender_and_tone
        .or_else(by_gender)
        .map(|p| p.voice_id.clone())
        .unwrap_or_else(|| default_voice_id.to_string())
}
