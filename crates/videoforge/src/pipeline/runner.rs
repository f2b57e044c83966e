use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures_util::{FutureExt, StreamExt};
use log::{info, warn};
use tracing::{info_span, Instrument};

use crate::agents::{
    keywords, MediaCurator, MediaResearcher, ScriptArchitect, StoryWriter, VoiceSelector,
};
use crate::db::{media_repo, script_repo, story_repo, video_repo, voice_over_repo, Database};
use crate::error::{ArtifactError, AssemblyError, JobError};
use crate::jobs::{GenerationJob, JobStage, JobStatus, JobTracker, StageRequest};
use crate::models::{
    FinalVideo, GeneratedStory, Script, ScriptOptions, Segment, Story, VoiceOver, VoicePreferences,
};
use crate::sanitize;
use crate::timing;
use crate::tools::{ClipWindow, MuxRequest, ToolError, Toolset};

use super::assembly;
use super::config::PipelineConfig;
use super::error::StageError;

const DESCRIPTION_CHARS: usize = 200;

/// What a finished stage hands to the tracker.
#[derive(Debug)]
struct StageOutcome {
    artifact_ref: String,
    message: String,
}

impl StageOutcome {
    fn new(artifact_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            artifact_ref: artifact_ref.into(),
            message: message.into(),
        }
    }
}

/// Executes claimed generation jobs.
#[derive(Clone)]
pub struct Pipeline {
    db: Database,
    tracker: JobTracker,
    tools: Toolset,
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    pub fn new(db: Database, tools: Toolset, config: Arc<PipelineConfig>) -> Self {
        Self {
            tracker: JobTracker::new(db.clone()),
            db,
            tools,
            config,
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Runs a PROCESSING job to COMPLETED or FAILED. Stage errors and
    /// panics become a failed job; only a failure to record the outcome
    /// is returned.
    pub async fn execute(&self, job: &GenerationJob) -> Result<GenerationJob, JobError> {
        let span = info_span!("stage",
            job_id = %job.id,
            stage = job.stage.as_str(),
            subject_id = %job.subject_id,
        );

        let result = AssertUnwindSafe(self.run_stage(job).instrument(span.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(StageError::Panicked(panic_message(panic.as_ref()))));

        let _entered = span.enter();
        match result {
            Ok(outcome) => {
                info!(
                    "{} job {} completed: {}",
                    job.stage, job.id, outcome.message
                );
                self.tracker
                    .complete_with_message(&job.id, &outcome.artifact_ref, &outcome.message)
            }
            Err(e) => {
                warn!("{} job {} failed: {}", job.stage, job.id, e);
                self.tracker.fail(&job.id, &e.job_message())
            }
        }
    }

    async fn run_stage(&self, job: &GenerationJob) -> Result<StageOutcome, StageError> {
        let subject = job.subject_id.as_str();
        match (job.stage, &job.request) {
            (JobStage::Story, StageRequest::Story) => self.run_story(subject).await,
            (JobStage::Script, StageRequest::Script(options)) => {
                self.run_script(subject, options).await
            }
            (JobStage::VoiceOver, StageRequest::VoiceOver(preferences)) => {
                self.run_voice_over(subject, preferences).await
            }
            (JobStage::Media, StageRequest::Media { voice_over_id }) => {
                self.run_media(subject, voice_over_id).await
            }
            (JobStage::Video, StageRequest::Video {
                voice_over_id,
                segments,
            }) => self.run_video(subject, voice_over_id, segments).await,
            (stage, _) => Err(StageError::RequestMismatch(stage)),
        }
    }

    async fn run_story(&self, story_id: &str) -> Result<StageOutcome, StageError> {
        let story = self.load_story(story_id)?;
        let content = StoryWriter::new(self.tools.generator.clone())
            .write(&story)
            .await?;

        let generated = GeneratedStory {
            id: uuid::Uuid::new_v4().to_string(),
            story_id: story.id.clone(),
            content,
            created_at: Utc::now(),
        };
        story_repo::insert_generated(&self.db, &generated)?;

        let words = generated.content.split_whitespace().count();
        Ok(StageOutcome::new(
            generated.id,
            format!("Story written ({} words)", words),
        ))
    }

    async fn run_script(
        &self,
        story_id: &str,
        options: &ScriptOptions,
    ) -> Result<StageOutcome, StageError> {
        let story = self.load_story(story_id)?;
        let narrative = story_repo::latest_generated(&self.db, story_id)?;

        let draft = ScriptArchitect::new(self.tools.generator.clone())
            .draft(&story, narrative.as_ref(), options)
            .await?;

        let now = Utc::now();
        let script = Script {
            id: uuid::Uuid::new_v4().to_string(),
            story_id: story.id,
            title: draft.title,
            sections: draft.sections,
            options: options.clone(),
            approved: false,
            created_at: now,
            modified_at: now,
        };
        script_repo::insert(&self.db, &script)?;

        Ok(StageOutcome::new(
            script.id,
            format!("Script drafted with {} sections", script.sections.len()),
        ))
    }

    async fn run_voice_over(
        &self,
        script_id: &str,
        preferences: &VoicePreferences,
    ) -> Result<StageOutcome, StageError> {
        preferences.settings.validate()?;
        let script = self.load_script(script_id)?;
        if !script.approved {
            return Err(ArtifactError::ScriptNotApproved(script.id).into());
        }

        let voice_id = VoiceSelector::new(
            self.tools.synthesizer.clone(),
            self.config.default_voice_id.clone(),
        )
        .select(preferences)
        .await?;

        let mut voice_over = VoiceOver {
            id: uuid::Uuid::new_v4().to_string(),
            script_id: script.id.clone(),
            voice_id,
            settings: preferences.settings,
            status: JobStatus::Processing,
            audio_ref: None,
            total_duration: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        voice_over_repo::insert(&self.db, &voice_over)?;

        let output = self.config.audio_dir.join(format!("{}.mp3", voice_over.id));
        let synthesized = match ensure_dir(&self.config.audio_dir).await {
            Ok(()) => self
                .tools
                .synthesizer
                .synthesize(
                    &script.narration(),
                    &voice_over.voice_id,
                    &voice_over.settings,
                    &output,
                )
                .await
                .and_then(|audio| {
                    if audio.duration.is_finite() && audio.duration > 0.0 {
                        Ok(audio)
                    } else {
                        Err(ToolError::decode(
                            "speech synthesis",
                            format!("unusable audio duration {}", audio.duration),
                        ))
                    }
                }),
            Err(e) => Err(e),
        };

        voice_over.completed_at = Some(Utc::now());
        match synthesized {
            Ok(audio) => {
                voice_over.status = JobStatus::Completed;
                voice_over.audio_ref = Some(audio.path.display().to_string());
                voice_over.total_duration = Some(audio.duration);
                voice_over_repo::update_result(&self.db, &voice_over)?;
                Ok(StageOutcome::new(
                    voice_over.id,
                    format!("Voice-over synthesized ({:.1}s)", audio.duration),
                ))
            }
            Err(e) => {
                voice_over.status = JobStatus::Failed;
                if let Err(db_err) = voice_over_repo::update_result(&self.db, &voice_over) {
                    warn!("Could not mark voice-over {} failed: {}", voice_over.id, db_err);
                }
                Err(StageError::tool(JobStage::VoiceOver, e))
            }
        }
    }

    async fn run_media(
        &self,
        script_id: &str,
        voice_over_id: &str,
    ) -> Result<StageOutcome, StageError> {
        let script = self.load_script(script_id)?;
        let voice_over = self.load_voice_over_for(&script, voice_over_id)?;
        voice_over.ensure_narrates(&script)?;
        let total_duration = voice_over.confirmed_duration()?;
        let segments = timing::build_segments(&script.sections, total_duration)?;
        let story = self.load_story(&script.story_id)?;
        let story_keywords = keywords::research_keywords(&story, &[]);

        let research = &self.config.research;
        let researcher = MediaResearcher::new(
            self.tools.search.clone(),
            research.safe_licenses.clone(),
            research.per_page,
            research.keywords_per_segment,
        );
        let curator = MediaCurator::new(self.tools.downloader.clone(), &self.config.clips_dir);
        ensure_dir(&self.config.clips_dir)
            .await
            .map_err(|e| StageError::tool(JobStage::Media, e))?;

        let researcher = &researcher;
        let curator = &curator;
        let story_keywords = story_keywords.as_slice();
        let results: Vec<Result<Segment, StageError>> = futures_util::stream::iter(segments)
            .map(|mut segment| {
                let span = info_span!("segment", segment_id = %segment.id);
                async move {
                    let candidates = researcher
                        .research(&segment, story_keywords)
                        .await
                        .map_err(|e| StageError::tool(JobStage::Media, e))?;
                    segment.clip = curator
                        .curate(&segment, &candidates)
                        .await
                        .map_err(|e| StageError::tool(JobStage::Media, e))?;
                    if segment.clip.is_none() {
                        warn!("Segment {} has no license-safe candidates", segment.id);
                    }
                    Ok::<Segment, StageError>(segment)
                }
                .instrument(span)
            })
            .buffer_unordered(research.concurrency.max(1))
            .collect()
            .await;

        let mut segments = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        segments.sort_by_key(|s| s.index);
        media_repo::replace_timeline(&self.db, &script.id, &voice_over.id, &segments)?;

        let unresolved = segments.iter().filter(|s| !s.is_resolved()).count();
        let message = if unresolved == 0 {
            format!("All {} segments bound", segments.len())
        } else {
            format!(
                "{} of {} segments unresolved",
                unresolved,
                segments.len()
            )
        };
        Ok(StageOutcome::new(script.id, message))
    }

    async fn run_video(
        &self,
        script_id: &str,
        voice_over_id: &str,
        segments: &[Segment],
    ) -> Result<StageOutcome, StageError> {
        let script = self.load_script(script_id)?;
        let voice_over = self.load_voice_over_for(&script, voice_over_id)?;
        voice_over.ensure_narrates(&script)?;
        let total_duration = voice_over.confirmed_duration()?;
        let expected = timing::build_segments(&script.sections, total_duration)?;
        assembly::verify_timeline(&expected, segments)?;

        let audio = voice_over
            .audio_ref
            .as_deref()
            .map(PathBuf::from)
            .ok_or_else(|| AssemblyError::VoiceOverNotReady(voice_over.id.clone()))?;

        let mut windows = Vec::with_capacity(segments.len());
        for segment in segments {
            let Some(ref clip) = segment.clip else {
                return Err(AssemblyError::IncompleteBinding {
                    unresolved: vec![segment.id.clone()],
                }
                .into());
            };
            let path = match clip.asset_ref.as_deref().map(Path::new) {
                Some(path) if path.exists() => path.to_path_buf(),
                _ => {
                    ensure_dir(&self.config.clips_dir)
                        .await
                        .map_err(|e| StageError::tool(JobStage::Video, e))?;
                    self.tools
                        .downloader
                        .download(clip, &self.config.clips_dir)
                        .await
                        .map_err(|e| StageError::tool(JobStage::Video, e))?
                }
            };
            windows.push(ClipWindow {
                path,
                clip_duration: clip.duration,
                start_time: segment.start_time,
                end_time: segment.end_time,
            });
        }

        let video_id = uuid::Uuid::new_v4().to_string();
        ensure_dir(&self.config.videos_dir)
            .await
            .map_err(|e| StageError::tool(JobStage::Video, e))?;
        let request = MuxRequest {
            audio,
            windows,
            total_duration,
            output: self.config.videos_dir.join(format!("{}.mp4", video_id)),
        };
        let muxed = self
            .tools
            .muxer
            .assemble(&request)
            .await
            .map_err(|e| StageError::tool(JobStage::Video, e))?;

        let video = FinalVideo {
            id: video_id,
            story_id: script.story_id.clone(),
            script_id: script.id.clone(),
            voice_over_id: voice_over.id.clone(),
            title: script.title.clone(),
            description: sanitize::truncate(&script.narration(), DESCRIPTION_CHARS),
            segments: segments.to_vec(),
            duration: total_duration,
            resolution: muxed.resolution,
            file_size: muxed.file_size,
            asset_ref: muxed.path.display().to_string(),
            status: JobStatus::Completed,
            created_at: Utc::now(),
        };
        video_repo::insert(&self.db, &video)?;

        Ok(StageOutcome::new(
            video.id,
            format!(
                "Video assembled ({:.1}s, {})",
                video.duration, video.resolution
            ),
        ))
    }

    fn load_story(&self, id: &str) -> Result<Story, StageError> {
        story_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| ArtifactError::not_found("Story", id).into())
    }

    fn load_script(&self, id: &str) -> Result<Script, StageError> {
        script_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| ArtifactError::not_found("Script", id).into())
    }

    fn load_voice_over_for(&self, script: &Script, id: &str) -> Result<VoiceOver, StageError> {
        let voice_over = voice_over_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| ArtifactError::not_found("Voice-over", id))?;
        if voice_over.script_id != script.id {
            return Err(ArtifactError::InvalidInput(format!(
                "voice-over '{}' belongs to another script",
                id
            ))
            .into());
        }
        Ok(voice_over)
    }
}

async fn ensure_dir(dir: &Path) -> Result<(), ToolError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ToolError::io(dir, e))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
