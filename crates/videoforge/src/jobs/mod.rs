//! Generation jobs: the state machine every pipeline stage runs under.

pub mod model;
pub mod tracker;

pub use model::{GenerationJob, JobStage, JobStatus, StageRequest};
pub use tracker::JobTracker;
