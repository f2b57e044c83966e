use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{ArtifactError, AssemblyError, TimingError};
use crate::jobs::JobStage;
use crate::sanitize;
use crate::tools::ToolError;

/// Anything that can go wrong while a claimed job runs. Never leaves the
/// stage boundary: the runner turns it into a FAILED job.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Generated output could not be parsed: {0}")]
    GenerationFormat(String),

    #[error("{stage} stage: {source}")]
    ExternalTool {
        stage: JobStage,
        #[source]
        source: ToolError,
    },

    #[error(transparent)]
    Timing(#[from] TimingError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error("Storage error: {0}")]
    Database(#[from] DatabaseError),

    #[error("{0} job carries a request for another stage")]
    RequestMismatch(JobStage),

    #[error("Stage panicked: {0}")]
    Panicked(String),
}

impl StageError {
    pub fn tool(stage: JobStage, source: ToolError) -> Self {
        StageError::ExternalTool { stage, source }
    }

    /// The message recorded on the failed job. Storage details stay in the
    /// log.
    pub fn job_message(&self) -> String {
        match self {
            StageError::Database(_) => "Internal storage error".to_string(),
            other => sanitize::job_message(&other.to_string()),
        }
    }
}
