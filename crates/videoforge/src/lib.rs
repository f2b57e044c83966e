pub mod agents;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod telemetry;
pub mod timing;
pub mod tools;
pub mod worker;

#[doc(hidden)]
pub mod test_support;

pub use config::{load_config, load_config_from_str, VideoForgeConfig};
pub use db::Database;
pub use error::{
    ArtifactError, AssemblyError, ConfigError, JobError, Result, TimingError, VideoForgeError,
    WorkerError,
};
pub use jobs::{GenerationJob, JobStage, JobStatus, JobTracker, StageRequest};
pub use orchestrator::{Halt, PipelineRun, RunOptions, VideoForge};
pub use pipeline::{
    Artifact, ArtifactKind, Pipeline, PipelineConfig, SegmentBinding, StageError, TaskGraph,
};
pub use secrets::{resolve_secret, SecretError, SecretSource};
pub use telemetry::init_tracing;
pub use tools::{ToolError, Toolset};
pub use worker::WorkerPool;
