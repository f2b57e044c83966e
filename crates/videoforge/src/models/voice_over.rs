use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ArtifactError, AssemblyError};
use crate::jobs::JobStatus;

use super::Script;

/// Synthesis parameters. Every value is bounded; see [`VoiceSettings::validate`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VoiceSettings {
    pub stability: f64,
    pub similarity_boost: f64,
    pub style: f64,
    pub use_speaker_boost: bool,
    pub speed: f64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.0,
            use_speaker_boost: true,
            speed: 1.0,
        }
    }
}

impl VoiceSettings {
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let unit = [
            ("stability", self.stability),
            ("similarity_boost", self.similarity_boost),
            ("style", self.style),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ArtifactError::InvalidVoiceSettings(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if !(0.5..=2.0).contains(&self.speed) {
            return Err(ArtifactError::InvalidVoiceSettings(format!(
                "speed must be within [0.5, 2.0], got {}",
                self.speed
            )));
        }
        Ok(())
    }
}

/// Caller preferences carried by a VOICE_OVER job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VoicePreferences {
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub settings: VoiceSettings,
}

/// A voice offered by the synthesis tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl VoiceProfile {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceOver {
    pub id: String,
    pub script_id: String,
    pub voice_id: String,
    pub settings: VoiceSettings,
    pub status: JobStatus,
    pub audio_ref: Option<String>,
    /// Unknown until synthesis has completed.
    pub total_duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl VoiceOver {
    /// Returns the synthesized duration, refusing when synthesis has not
    /// confirmed one.
    pub fn confirmed_duration(&self) -> Result<f64, AssemblyError> {
        match (self.status, self.total_duration) {
            (JobStatus::Completed, Some(d)) if d > 0.0 => Ok(d),
            _ => Err(AssemblyError::VoiceOverNotReady(self.id.clone())),
        }
    }

    /// Refuses to narrate `script` unless it is approved and has not been
    /// edited since this voice-over was started.
    pub fn ensure_narrates(&self, script: &Script) -> Result<(), ArtifactError> {
        if !script.approved {
            return Err(ArtifactError::ScriptNotApproved(script.id.clone()));
        }
        if script.modified_at > self.created_at {
            return Err(ArtifactError::StaleVoiceOver {
                voice_over_id: self.id.clone(),
                script_id: script.id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        VoiceSettings::default().validate().unwrap();
    }

    #[test]
    fn test_settings_out_of_range() {
        let settings = VoiceSettings {
            similarity_boost: 1.2,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("similarity_boost"));

        let settings = VoiceSettings {
            speed: 0.4,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = VoiceSettings {
            speed: 2.0,
            stability: 0.0,
            ..Default::default()
        };
        settings.validate().unwrap();
    }

    #[test]
    fn test_confirmed_duration_requires_completion() {
        let mut vo = VoiceOver {
            id: "vo-1".to_string(),
            script_id: "script-1".to_string(),
            voice_id: "v".to_string(),
            settings: VoiceSettings::default(),
            status: JobStatus::Processing,
            audio_ref: None,
            total_duration: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        assert!(vo.confirmed_duration().is_err());

        vo.status = JobStatus::Completed;
        vo.total_duration = Some(42.5);
        assert_eq!(vo.confirmed_duration().unwrap(), 42.5);
    }

    #[test]
    fn test_edited_script_outdates_voice_over() {
        use crate::test_support;

        let vo = test_support::voice_over("vo-1", "script-1", Some(100.0));
        let mut script = test_support::script("script-1", "story-1", test_support::three_sections());
        script.modified_at = vo.created_at;
        vo.ensure_narrates(&script).unwrap();

        script.approved = false;
        assert!(matches!(
            vo.ensure_narrates(&script),
            Err(ArtifactError::ScriptNotApproved(_))
        ));

        // Approving again does not make the old narration current.
        script.approved = true;
        script.modified_at = vo.created_at + chrono::Duration::seconds(1);
        assert!(matches!(
            vo.ensure_narrates(&script),
            Err(ArtifactError::StaleVoiceOver { .. })
        ));
    }
}
