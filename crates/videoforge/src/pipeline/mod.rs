pub mod assembly;
pub mod config;
pub mod error;
pub mod graph;
pub mod runner;

pub use assembly::SegmentBinding;
pub use config::PipelineConfig;
pub use error::StageError;
pub use graph::{Artifact, ArtifactKind, Role, TaskGraph};
pub use runner::Pipeline;
