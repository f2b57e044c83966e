//! The caller-facing facade.
//!
//! [`VideoForge`] owns the artifact store, the job tracker and the worker
//! pool. Stage methods validate their inputs, submit one job and return
//! it; [`VideoForge::await_job`] polls until the job is terminal, and
//! [`VideoForge::run_pipeline`] walks the agent task graph one stage at a
//! time.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};

use crate::agents::VoiceSelector;
use crate::config::{JobsConfig, VideoForgeConfig};
use crate::db::media_repo::{self, StoredTimeline};
use crate::db::{script_repo, story_repo, video_repo, voice_over_repo, Database};
use crate::error::{ArtifactError, Result, VideoForgeError, WorkerError};
use crate::jobs::{GenerationJob, JobStage, JobStatus, JobTracker, StageRequest};
use crate::models::{
    FinalVideo, FinalVideoUpdate, MediaClip, NewStory, Script, ScriptOptions, ScriptUpdate,
    Segment, Story, VoiceOver, VoicePreferences,
};
use crate::pipeline::{
    assembly, Artifact, ArtifactKind, Pipeline, PipelineConfig, SegmentBinding, TaskGraph,
};
use crate::timing;
use crate::tools::{SynthesizedAudio, Toolset};
use crate::worker::{JobOutcome, QueuedJob, WorkerPool};

/// Longest text accepted by [`VideoForge::preview_voice`].
pub const PREVIEW_MAX_CHARS: usize = 500;

/// Choices for a full [`VideoForge::run_pipeline`] walk.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub script: ScriptOptions,
    pub voice: VoicePreferences,
    /// Approve the drafted script without a human review.
    pub auto_approve: bool,
}

/// Why a pipeline walk stopped before the final video.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// The drafted script needs approval before a voice-over is made.
    AwaitingApproval { script_id: String },
    /// Research left segments without a clip; bind them and assemble.
    UnresolvedSegments {
        script_id: String,
        voice_over_id: String,
        segment_ids: Vec<String>,
    },
}

/// Artifacts produced by a pipeline walk, in production order.
#[derive(Debug)]
pub struct PipelineRun {
    pub artifacts: Vec<Artifact>,
    pub halted: Option<Halt>,
}

impl PipelineRun {
    pub fn final_video(&self) -> Option<&FinalVideo> {
        self.artifacts.iter().find_map(|a| match a {
            Artifact::FinalVideo(video) => Some(video),
            _ => None,
        })
    }
}

pub struct VideoForge {
    db: Database,
    tracker: JobTracker,
    tools: Toolset,
    config: Arc<PipelineConfig>,
    jobs: JobsConfig,
    pool: WorkerPool,
}

impl VideoForge {
    pub fn new(
        db: Database,
        tools: Toolset,
        config: PipelineConfig,
        jobs: JobsConfig,
        worker_count: usize,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let pipeline = Pipeline::new(db.clone(), tools.clone(), Arc::clone(&config));
        let pool = WorkerPool::new(pipeline, worker_count, jobs.queue_capacity)?;

        Ok(Self {
            tracker: JobTracker::new(db.clone()),
            db,
            tools,
            config,
            jobs,
            pool,
        })
    }

    /// Opens the configured database and builds the production tools.
    pub fn from_config(config: &VideoForgeConfig) -> Result<Self> {
        let db = Database::open(&config.resolved_database_path())?;
        let tools = Toolset::from_config(config)?;
        Self::new(
            db,
            tools,
            PipelineConfig::from_config(config),
            config.jobs.clone(),
            config.worker_count,
        )
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    // ─── Stories ────────────────────────────────────────────────────────

    pub fn create_story(&self, new_story: NewStory) -> Result<Story> {
        new_story.validate()?;
        let story = new_story.into_story(uuid::Uuid::new_v4().to_string(), Utc::now());
        story_repo::insert(&self.db, &story)?;
        info!("Created story {} ({})", story.id, story.topic);
        Ok(story)
    }

    pub fn get_story(&self, story_id: &str) -> Result<Story> {
        Ok(story_repo::find_by_id(&self.db, story_id)?
            .ok_or_else(|| ArtifactError::not_found("Story", story_id))?)
    }

    pub fn list_stories(&self, owner_id: &str) -> Result<Vec<Story>> {
        Ok(story_repo::list_by_owner(&self.db, owner_id)?)
    }

    // ─── Job submission ─────────────────────────────────────────────────

    /// Records a PENDING job and queues it. A job that cannot be queued is
    /// failed at once so it does not hold the subject's slot.
    pub fn submit(&self, subject_id: &str, request: StageRequest) -> Result<GenerationJob> {
        let job = self.tracker.submit(subject_id, request)?;
        if let Err(e) = self.pool.submit(QueuedJob::from(&job)) {
            warn!("Could not queue job {}: {}", job.id, e);
            if let Err(fail_err) = self
                .tracker
                .force_fail(&job.id, &format!("Could not queue job: {}", e))
            {
                warn!("Could not release job {}: {}", job.id, fail_err);
            }
            return Err(e.into());
        }
        Ok(job)
    }

    pub fn generate_story(&self, story_id: &str) -> Result<GenerationJob> {
        self.get_story(story_id)?;
        self.submit(story_id, StageRequest::Story)
    }

    pub fn generate_script(&self, story_id: &str, options: ScriptOptions) -> Result<GenerationJob> {
        self.get_story(story_id)?;
        self.submit(story_id, StageRequest::Script(options))
    }

    /// Rejected before submission when the settings are out of range or
    /// the script is not approved.
    pub fn generate_voice_over(
        &self,
        script_id: &str,
        preferences: VoicePreferences,
    ) -> Result<GenerationJob> {
        preferences.settings.validate()?;
        let script = self.get_script(script_id)?;
        if !script.approved {
            return Err(ArtifactError::ScriptNotApproved(script.id).into());
        }
        self.submit(script_id, StageRequest::VoiceOver(preferences))
    }

    /// Researches and curates a clip for every segment of the script's
    /// timeline against a completed voice-over. The script must still be
    /// approved and unedited since that voice-over was started.
    pub fn research_media(&self, script_id: &str, voice_over_id: &str) -> Result<GenerationJob> {
        let script = self.get_script(script_id)?;
        let voice_over = self.voice_over_for(&script, voice_over_id)?;
        voice_over.ensure_narrates(&script)?;
        voice_over.confirmed_duration()?;
        self.submit(
            script_id,
            StageRequest::Media {
                voice_over_id: voice_over.id,
            },
        )
    }

    /// Submits the VIDEO job. `bindings` override the stored timeline's
    /// clips; every segment must end up bound, or nothing is submitted.
    pub fn assemble(
        &self,
        script_id: &str,
        voice_over_id: &str,
        bindings: &[SegmentBinding],
    ) -> Result<GenerationJob> {
        let script = self.get_script(script_id)?;
        let voice_over = self.voice_over_for(&script, voice_over_id)?;
        voice_over.ensure_narrates(&script)?;
        let total_duration = voice_over.confirmed_duration()?;

        let timeline = match media_repo::load_timeline(&self.db, script_id)? {
            Some(stored) if stored.voice_over_id == voice_over.id => stored.segments,
            _ => timing::build_segments(&script.sections, total_duration)?,
        };
        let segments = assembly::resolve_bindings(&timeline, bindings)?;

        self.submit(
            script_id,
            StageRequest::Video {
                voice_over_id: voice_over.id,
                segments,
            },
        )
    }

    /// Blocks until the job is COMPLETED. A FAILED job, a PENDING job past
    /// the stall threshold, or pool shutdown ends the wait with an error.
    pub fn await_job(&self, job_id: &str) -> Result<GenerationJob> {
        loop {
            let job = self.tracker.get(job_id)?;
            match job.status {
                JobStatus::Completed => return Ok(job),
                JobStatus::Failed => {
                    return Err(VideoForgeError::StageFailed {
                        stage: job.stage,
                        job_id: job.id,
                        message: job.message.unwrap_or_default(),
                    })
                }
                JobStatus::Pending if job.is_stalled(Utc::now(), self.jobs.stalled_after()) => {
                    let waited = Utc::now().signed_duration_since(job.created_at);
                    return Err(VideoForgeError::Stalled {
                        stage: job.stage,
                        job_id: job.id,
                        waited_secs: waited.num_seconds().max(0) as u64,
                    });
                }
                _ => {}
            }

            if self.pool.is_shutdown() {
                return Err(WorkerError::ShuttingDown.into());
            }
            if let Some(outcome) = self.pool.recv_result_timeout(self.jobs.poll_interval()) {
                log_outcome(&outcome);
            }
        }
    }

    /// Submits one stage, waits for it and loads what it produced.
    pub fn run_stage(&self, subject_id: &str, request: StageRequest) -> Result<Artifact> {
        let job = self.submit(subject_id, request)?;
        let job = self.await_job(&job.id)?;
        self.artifact_for(&job)
    }

    /// Walks the standard task graph from a story to a final video. Stops
    /// early at a script awaiting approval or at unresolved segments; the
    /// caller resumes with the stage methods.
    pub fn run_pipeline(&self, story_id: &str, options: RunOptions) -> Result<PipelineRun> {
        let order = TaskGraph::standard().stage_order(&[ArtifactKind::Story])?;
        let story = self.get_story(story_id)?;
        let mut artifacts = vec![Artifact::Story(story)];

        let mut script_id: Option<String> = None;
        let mut voice_over_id: Option<String> = None;

        for stage in order {
            info!("Pipeline for story {}: {} stage", story_id, stage);
            match stage {
                JobStage::Story => {
                    artifacts.push(self.run_stage(story_id, StageRequest::Story)?);
                }
                JobStage::Script => {
                    let mut script = match self
                        .run_stage(story_id, StageRequest::Script(options.script.clone()))?
                    {
                        Artifact::Script(script) => script,
                        other => return Err(unexpected(stage, &other)),
                    };
                    if !script.approved {
                        if !options.auto_approve {
                            let halt = Halt::AwaitingApproval {
                                script_id: script.id.clone(),
                            };
                            artifacts.push(Artifact::Script(script));
                            return Ok(PipelineRun {
                                artifacts,
                                halted: Some(halt),
                            });
                        }
                        script = self.update_script(
                            &script.id,
                            ScriptUpdate {
                                approved: Some(true),
                                ..Default::default()
                            },
                        )?;
                    }
                    script_id = Some(script.id.clone());
                    artifacts.push(Artifact::Script(script));
                }
                JobStage::VoiceOver => {
                    let job = self
                        .generate_voice_over(required(&script_id, stage)?, options.voice.clone())?;
                    let job = self.await_job(&job.id)?;
                    let artifact = self.artifact_for(&job)?;
                    let Artifact::VoiceOver(ref voice_over) = artifact else {
                        return Err(unexpected(stage, &artifact));
                    };
                    voice_over_id = Some(voice_over.id.clone());
                    artifacts.push(artifact);
                }
                JobStage::Media => {
                    let script_id = required(&script_id, stage)?;
                    let voice_over_id = required(&voice_over_id, stage)?;
                    let job = self.research_media(script_id, voice_over_id)?;
                    let job = self.await_job(&job.id)?;
                    let artifact = self.artifact_for(&job)?;
                    let Artifact::Timeline(ref segments) = artifact else {
                        return Err(unexpected(stage, &artifact));
                    };
                    let unresolved: Vec<String> = segments
                        .iter()
                        .filter(|s| !s.is_resolved())
                        .map(|s| s.id.clone())
                        .collect();
                    artifacts.push(artifact);
                    if !unresolved.is_empty() {
                        return Ok(PipelineRun {
                            artifacts,
                            halted: Some(Halt::UnresolvedSegments {
                                script_id: script_id.to_string(),
                                voice_over_id: voice_over_id.to_string(),
                                segment_ids: unresolved,
                            }),
                        });
                    }
                }
                JobStage::Video => {
                    let script_id = required(&script_id, stage)?;
                    let voice_over_id = required(&voice_over_id, stage)?;
                    let job = self.assemble(script_id, voice_over_id, &[])?;
                    let job = self.await_job(&job.id)?;
                    artifacts.push(self.artifact_for(&job)?);
                }
            }
        }

        Ok(PipelineRun {
            artifacts,
            halted: None,
        })
    }

    /// Loads the artifact a completed job points at.
    pub fn artifact_for(&self, job: &GenerationJob) -> Result<Artifact> {
        let artifact_ref = job
            .artifact_ref
            .as_deref()
            .ok_or_else(|| ArtifactError::not_found("Artifact for job", &job.id))?;

        let artifact = match job.stage {
            JobStage::Story => Artifact::GeneratedStory(
                story_repo::find_generated(&self.db, artifact_ref)?
                    .ok_or_else(|| ArtifactError::not_found("Generated story", artifact_ref))?,
            ),
            JobStage::Script => Artifact::Script(self.get_script(artifact_ref)?),
            JobStage::VoiceOver => Artifact::VoiceOver(self.get_voice_over(artifact_ref)?),
            JobStage::Media => Artifact::Timeline(
                self.timeline(artifact_ref)?
                    .map(|t| t.segments)
                    .unwrap_or_default(),
            ),
            JobStage::Video => Artifact::FinalVideo(self.get_final_video(artifact_ref)?),
        };
        Ok(artifact)
    }

    // ─── Jobs ───────────────────────────────────────────────────────────

    pub fn get_job(&self, job_id: &str) -> Result<GenerationJob> {
        Ok(self.tracker.get(job_id)?)
    }

    pub fn jobs(&self, subject_id: &str) -> Result<Vec<GenerationJob>> {
        Ok(self.tracker.list(subject_id)?)
    }

    /// PENDING jobs older than the configured threshold.
    pub fn stalled_jobs(&self) -> Result<Vec<GenerationJob>> {
        Ok(self.tracker.stalled(self.jobs.stalled_after())?)
    }

    pub fn force_fail(&self, job_id: &str, message: &str) -> Result<GenerationJob> {
        Ok(self.tracker.force_fail(job_id, message)?)
    }

    // ─── Scripts ────────────────────────────────────────────────────────

    pub fn get_script(&self, script_id: &str) -> Result<Script> {
        Ok(script_repo::find_by_id(&self.db, script_id)?
            .ok_or_else(|| ArtifactError::not_found("Script", script_id))?)
    }

    pub fn list_scripts(&self, story_id: &str) -> Result<Vec<Script>> {
        Ok(script_repo::list_by_story(&self.db, story_id)?)
    }

    pub fn update_script(&self, script_id: &str, update: ScriptUpdate) -> Result<Script> {
        let mut script = self.get_script(script_id)?;
        script.apply_update(update, Utc::now())?;
        script_repo::update(&self.db, &script)?;
        debug!("Updated script {} (approved: {})", script.id, script.approved);
        Ok(script)
    }

    // ─── Voice-overs ────────────────────────────────────────────────────

    pub fn get_voice_over(&self, voice_over_id: &str) -> Result<VoiceOver> {
        Ok(voice_over_repo::find_by_id(&self.db, voice_over_id)?
            .ok_or_else(|| ArtifactError::not_found("Voice-over", voice_over_id))?)
    }

    pub fn list_voice_overs(&self, script_id: &str) -> Result<Vec<VoiceOver>> {
        Ok(voice_over_repo::list_by_script(&self.db, script_id)?)
    }

    /// Synthesizes a short sample into the audio directory without
    /// recording a voice-over.
    pub fn preview_voice(
        &self,
        text: &str,
        preferences: &VoicePreferences,
    ) -> Result<SynthesizedAudio> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > PREVIEW_MAX_CHARS {
            return Err(ArtifactError::InvalidInput(format!(
                "preview text must be 1 to {} characters",
                PREVIEW_MAX_CHARS
            ))
            .into());
        }
        preferences.settings.validate()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| WorkerError::Runtime(e.to_string()))?;

        let selector = VoiceSelector::new(
            self.tools.synthesizer.clone(),
            self.config.default_voice_id.clone(),
        );
        let preview_dir = self.config.audio_dir.join("previews");
        let output = preview_dir.join(format!("{}.mp3", uuid::Uuid::new_v4()));

        runtime.block_on(async {
            let voice_id = selector.select(preferences).await?;
            create_dir(&preview_dir).await?;
            let audio = self
                .tools
                .synthesizer
                .synthesize(text, &voice_id, &preferences.settings, &output)
                .await?;
            Ok::<_, VideoForgeError>(audio)
        })
    }

    // ─── Media ──────────────────────────────────────────────────────────

    pub fn timeline(&self, script_id: &str) -> Result<Option<StoredTimeline>> {
        Ok(media_repo::load_timeline(&self.db, script_id)?)
    }

    /// Binds a clip to one segment of the stored timeline, typically one
    /// research left unresolved.
    pub fn bind_clip(&self, script_id: &str, segment_id: &str, clip: MediaClip) -> Result<Segment> {
        if !media_repo::bind_segment(&self.db, script_id, segment_id, &clip)? {
            return Err(ArtifactError::not_found("Segment", segment_id).into());
        }
        let timeline = self
            .timeline(script_id)?
            .ok_or_else(|| ArtifactError::not_found("Timeline", script_id))?;
        let segment = timeline
            .segments
            .into_iter()
            .find(|s| s.id == segment_id)
            .ok_or_else(|| ArtifactError::not_found("Segment", segment_id))?;
        info!("Bound clip {} to {} of script {}", clip.id, segment_id, script_id);
        Ok(segment)
    }

    // ─── Final videos ───────────────────────────────────────────────────

    pub fn get_final_video(&self, video_id: &str) -> Result<FinalVideo> {
        Ok(video_repo::find_by_id(&self.db, video_id)?
            .ok_or_else(|| ArtifactError::not_found("Final video", video_id))?)
    }

    pub fn list_final_videos(&self, story_id: &str) -> Result<Vec<FinalVideo>> {
        Ok(video_repo::list_by_story(&self.db, story_id)?)
    }

    pub fn update_final_video(&self, video_id: &str, update: FinalVideoUpdate) -> Result<FinalVideo> {
        let mut video = self.get_final_video(video_id)?;
        if let Some(title) = update.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ArtifactError::InvalidInput("title must not be empty".to_string()).into());
            }
            video.title = title.to_string();
        }
        if let Some(description) = update.description {
            video.description = description.trim().to_string();
        }
        video_repo::update_metadata(&self.db, &video.id, &video.title, &video.description)?;
        Ok(video)
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────

    /// Flag a signal handler can set to stop the workers.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.pool.shutdown_flag()
    }

    /// Stops the workers after their current job and joins them.
    pub fn shutdown(self) {
        self.pool.shutdown();
        self.pool.wait();
    }

    fn voice_over_for(&self, script: &Script, voice_over_id: &str) -> Result<VoiceOver> {
        let voice_over = self.get_voice_over(voice_over_id)?;
        if voice_over.script_id != script.id {
            return Err(ArtifactError::InvalidInput(format!(
                "voice-over '{}' belongs to another script",
                voice_over_id
            ))
            .into());
        }
        Ok(voice_over)
    }
}

fn required<'a>(id: &'a Option<String>, stage: JobStage) -> Result<&'a str> {
    id.as_deref().ok_or_else(|| {
        ArtifactError::InvalidInput(format!("{} stage reached without its input", stage)).into()
    })
}

fn unexpected(stage: JobStage, artifact: &Artifact) -> VideoForgeError {
    ArtifactError::InvalidInput(format!(
        "{} stage produced {:?}",
        stage,
        artifact.kind()
    ))
    .into()
}

async fn create_dir(dir: &Path) -> std::result::Result<(), crate::tools::ToolError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| crate::tools::ToolError::io(dir, e))
}

fn log_outcome(outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Finished(job) => debug!("Job {} finished as {}", job.id, job.status),
        JobOutcome::NotClaimed { job_id, reason } => {
            debug!("Job {} was not claimed: {}", job_id, reason)
        }
        JobOutcome::Untracked { job_id, error } => {
            warn!("Job {} outcome was not recorded: {}", job_id, error)
        }
    }
}
