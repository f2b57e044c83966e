pub mod job;
pub mod pool;

pub use job::{JobOutcome, QueuedJob};
pub use pool::WorkerPool;
