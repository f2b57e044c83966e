use std::path::PathBuf;
use thiserror::Error;

use crate::jobs::{JobStage, JobStatus};

#[derive(Error, Debug)]
pub enum VideoForgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Timing error: {0}")]
    Timing(#[from] TimingError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Tool error: {0}")]
    Tool(#[from] crate::tools::ToolError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error(transparent)]
    Stage(#[from] crate::pipeline::StageError),

    #[error("Task graph error: {0}")]
    Graph(#[from] crate::pipeline::graph::GraphError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] crate::telemetry::TelemetryError),

    #[error("{stage} job {job_id} failed: {message}")]
    StageFailed {
        stage: JobStage,
        job_id: String,
        message: String,
    },

    #[error("{stage} job {job_id} has been pending for {waited_secs}s without a claim")]
    Stalled {
        stage: JobStage,
        job_id: String,
        waited_secs: u64,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Could not resolve API key for {tool}: {source}")]
    Credential {
        tool: &'static str,
        #[source]
        source: crate::secrets::SecretError,
    },
}

/// Errors raised by the generation job state machine.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("An active {stage} job ({job_id}) already exists for subject '{subject_id}'")]
    Conflict {
        subject_id: String,
        stage: JobStage,
        job_id: String,
    },

    #[error("Job '{job_id}' cannot move from {from} to {to}")]
    InvalidState {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimingError {
    #[error("Invalid timing input: {0}")]
    InvalidInput(String),
}

#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Segments without a bound clip: {}", unresolved.join(", "))]
    IncompleteBinding { unresolved: Vec<String> },

    #[error("Binding for segment '{segment_id}' does not match the computed timeline")]
    TimelineMismatch { segment_id: String },

    #[error("Voice-over '{0}' has no confirmed duration yet")]
    VoiceOverNotReady(String),
}

/// Errors about the artifacts a stage reads or a caller edits.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Script '{0}' is approved; its sections are fixed")]
    ScriptLocked(String),

    #[error("Script '{0}' must be approved before narration or assembly")]
    ScriptNotApproved(String),

    #[error("Voice-over '{voice_over_id}' predates the last edit of script '{script_id}'")]
    StaleVoiceOver {
        voice_over_id: String,
        script_id: String,
    },

    #[error("Invalid voice settings: {0}")]
    InvalidVoiceSettings(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ArtifactError {
    pub fn not_found(kind: &'static str, id: &str) -> Self {
        ArtifactError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Worker pool is shutting down")]
    ShuttingDown,

    #[error("Failed to build async runtime for worker: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, VideoForgeError>;
