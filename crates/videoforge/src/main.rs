use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde::Serialize;

use videoforge::models::{
    MediaClip, NewStory, ScriptOptions, ScriptStyle, ScriptUpdate, VoicePreferences,
};
use videoforge::{
    load_config, sanitize, telemetry, Artifact, ArtifactError, Halt, RunOptions, SegmentBinding,
    VideoForge, VideoForgeError,
};

#[derive(Parser)]
#[command(name = "videoforge")]
#[command(about = "Turn a story into a narrated, illustrated video")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(
        short,
        long,
        global = true,
        env = "VIDEOFORGE_CONFIG",
        default_value = "videoforge.json"
    )]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage stories
    Story {
        #[command(subcommand)]
        command: StoryCommands,
    },
    /// Run the pipeline for a story, stopping where a human is needed
    Run {
        story_id: String,
        /// Approve the drafted script without review
        #[arg(long)]
        approve: bool,
        #[arg(long, value_enum, default_value_t = StyleArg::Professional)]
        style: StyleArg,
        /// Target video length in minutes
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long)]
        voice_id: Option<String>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        voice_tone: Option<String>,
    },
    /// Approve a drafted script
    Approve { script_id: String },
    /// Assemble the final video from the script's timeline
    Assemble {
        script_id: String,
        voice_over_id: String,
        /// JSON array of {"segment_id", "clip"} overrides
        #[arg(long)]
        bindings: Option<PathBuf>,
    },
    /// List jobs for a story or script
    Jobs { subject_id: String },
    /// List pending jobs nobody has claimed
    Stalled,
    /// Fail a pending job so the stage can be resubmitted
    ForceFail { job_id: String, message: String },
    /// Bind a clip to one segment of a script's timeline
    Bind {
        script_id: String,
        segment_id: String,
        /// JSON file describing the clip
        clip: PathBuf,
    },
}

#[derive(Subcommand)]
enum StoryCommands {
    /// Create a story
    Create {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        genre: String,
        #[arg(long)]
        audience: String,
        #[arg(long)]
        tone: String,
        #[arg(long)]
        details: Option<String>,
        /// Research keyword; repeatable
        #[arg(long = "keyword")]
        keywords: Vec<String>,
    },
    /// List an owner's stories
    List {
        #[arg(long)]
        owner: String,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum StyleArg {
    Professional,
    Conversational,
    Dramatic,
}

impl From<StyleArg> for ScriptStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Professional => ScriptStyle::Professional,
            StyleArg::Conversational => ScriptStyle::Conversational,
            StyleArg::Dramatic => ScriptStyle::Dramatic,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init_tracing(&config.log_level, cli.json_logs) {
        eprintln!("warning: {}", e);
    }

    let forge = match VideoForge::from_config(&config) {
        Ok(forge) => forge,
        Err(e) => {
            error!("Startup failed: {}", e);
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = forge.shutdown_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown.store(true, Ordering::Relaxed);
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let result = run(&forge, cli.command);
    forge.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(forge: &VideoForge, command: Commands) -> Result<(), VideoForgeError> {
    match command {
        Commands::Story { command } => match command {
            StoryCommands::Create {
                owner,
                topic,
                genre,
                audience,
                tone,
                details,
                keywords,
            } => print_json(&forge.create_story(NewStory {
                owner_id: owner,
                topic,
                genre,
                target_audience: audience,
                tone,
                additional_details: details,
                research_keywords: keywords,
            })?),
            StoryCommands::List { owner } => print_json(&forge.list_stories(&owner)?),
        },
        Commands::Run {
            story_id,
            approve,
            style,
            minutes,
            voice_id,
            gender,
            voice_tone,
        } => {
            let options = RunOptions {
                script: ScriptOptions {
                    style: style.into(),
                    target_duration_minutes: minutes,
                    ..Default::default()
                },
                voice: VoicePreferences {
                    voice_id,
                    gender,
                    tone: voice_tone,
                    ..Default::default()
                },
                auto_approve: approve,
            };
            let run = forge.run_pipeline(&story_id, options)?;
            for artifact in &run.artifacts {
                println!("{}", describe(artifact));
            }
            match run.halted {
                None => info!("Pipeline for story {} finished", story_id),
                Some(Halt::AwaitingApproval { script_id }) => {
                    println!(
                        "Script {} awaits approval: videoforge approve {}",
                        script_id, script_id
                    );
                }
                Some(Halt::UnresolvedSegments {
                    script_id,
                    voice_over_id,
                    segment_ids,
                }) => {
                    println!(
                        "No clip found for {}; bind them, then: videoforge assemble {} {}",
                        segment_ids.join(", "),
                        script_id,
                        voice_over_id
                    );
                }
            }
            Ok(())
        }
        Commands::Approve { script_id } => print_json(&forge.update_script(
            &script_id,
            ScriptUpdate {
                approved: Some(true),
                ..Default::default()
            },
        )?),
        Commands::Assemble {
            script_id,
            voice_over_id,
            bindings,
        } => {
            let bindings: Vec<SegmentBinding> = match bindings {
                Some(path) => read_json(&path)?,
                None => Vec::new(),
            };
            let job = forge.assemble(&script_id, &voice_over_id, &bindings)?;
            let job = forge.await_job(&job.id)?;
            print_json(&forge.artifact_for(&job).map(|artifact| describe(&artifact))?)
        }
        Commands::Jobs { subject_id } => print_json(&forge.jobs(&subject_id)?),
        Commands::Stalled => print_json(&forge.stalled_jobs()?),
        Commands::ForceFail { job_id, message } => {
            print_json(&forge.force_fail(&job_id, &message)?)
        }
        Commands::Bind {
            script_id,
            segment_id,
            clip,
        } => {
            let clip: MediaClip = read_json(&clip)?;
            print_json(&forge.bind_clip(&script_id, &segment_id, clip)?)
        }
    }
}

fn describe(artifact: &Artifact) -> String {
    match artifact {
        Artifact::Story(story) => format!("story        {}  {}", story.id, story.topic),
        Artifact::GeneratedStory(generated) => format!(
            "narrative    {}  {} words",
            generated.id,
            generated.content.split_whitespace().count()
        ),
        Artifact::Script(script) => format!(
            "script       {}  {} ({} sections, approved: {})",
            script.id,
            script.title,
            script.sections.len(),
            script.approved
        ),
        Artifact::VoiceOver(voice_over) => format!(
            "voice-over   {}  {:.1}s",
            voice_over.id,
            voice_over.total_duration.unwrap_or_default()
        ),
        Artifact::Candidates { segment_id, clips } => {
            format!("candidates   {}  {} clips", segment_id, clips.len())
        }
        Artifact::Timeline(segments) => format!(
            "timeline     {} segments, {} bound",
            segments.len(),
            segments.iter().filter(|s| s.is_resolved()).count()
        ),
        Artifact::FinalVideo(video) => format!(
            "video        {}  {} ({:.1}s, {})",
            video.id, video.asset_ref, video.duration, video.resolution
        ),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, VideoForgeError> {
    let invalid = |e: &dyn std::fmt::Display| {
        ArtifactError::InvalidInput(format!("{}: {}", sanitize::redact_path(path), e))
    };
    let content = fs::read_to_string(path).map_err(|e| invalid(&e))?;
    Ok(serde_json::from_str(&content).map_err(|e| invalid(&e))?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), VideoForgeError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| ArtifactError::InvalidInput(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}
