use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, error, info, warn};

use crate::error::{JobError, WorkerError};
use crate::pipeline::Pipeline;
use crate::worker::job::{JobOutcome, QueuedJob};

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Fixed set of OS threads executing generation jobs. Each worker drives
/// its job's tool calls on its own single-threaded tokio runtime.
///
/// Outcomes are only wake-ups for waiters; the tracker holds the job's
/// state. The outcome queue is bounded and a worker drops an outcome
/// nobody has room for instead of blocking.
pub struct WorkerPool {
    job_sender: Sender<QueuedJob>,
    result_receiver: Receiver<JobOutcome>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(
        pipeline: Pipeline,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }
        let (job_sender, job_receiver) = bounded::<QueuedJob>(queue_capacity.max(1));
        let (result_sender, result_receiver) =
            bounded::<JobOutcome>(result_capacity(worker_count, queue_capacity));
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_pipeline = pipeline.clone();

            let handle = thread::Builder::new()
                .name(format!("videoforge-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, job_rx, result_tx, shutdown_flag, worker_pipeline);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;
            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
        })
    }

    /// Queues a submitted job. Blocks while the queue is full.
    pub fn submit(&self, job: QueuedJob) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ShuttingDown);
        }

        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<JobOutcome> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobOutcome> {
        self.result_receiver.recv().ok()
    }

    pub fn recv_result_timeout(&self, timeout: Duration) -> Option<JobOutcome> {
        self.result_receiver.recv_timeout(timeout).ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Flag a signal handler can set to stop the pool.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Stops accepting work and joins every worker. A job being executed
    /// runs to completion first.
    pub fn wait(self) {
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }
}

/// Room for one outcome per queued or running job.
fn result_capacity(worker_count: usize, queue_capacity: usize) -> usize {
    queue_capacity.max(1) + worker_count
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<QueuedJob>,
    result_sender: Sender<JobOutcome>,
    shutdown: Arc<AtomicBool>,
    pipeline: Pipeline,
) {
    debug!("Worker {} started", worker_id);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(
                "{}",
                WorkerError::Runtime(format!("worker {}: {}", worker_id, e))
            );
            return;
        }
    };

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(RECV_TIMEOUT) {
            Ok(queued) => {
                debug!(
                    "Worker {} picked up {} job {}",
                    worker_id, queued.stage, queued.job_id
                );
                let outcome = execute(&runtime, &pipeline, &queued);
                match result_sender.try_send(outcome) {
                    Ok(()) => {}
                    Err(TrySendError::Full(outcome)) => {
                        debug!(
                            "Worker {} dropped outcome of job {}: no waiter",
                            worker_id,
                            outcome.job_id()
                        );
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        error!("Worker {} failed to send result: channel closed", worker_id);
                        break;
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

fn execute(
    runtime: &tokio::runtime::Runtime,
    pipeline: &Pipeline,
    queued: &QueuedJob,
) -> JobOutcome {
    let job = match pipeline.tracker().claim(&queued.job_id) {
        Ok(job) => job,
        Err(e @ (JobError::InvalidState { .. } | JobError::NotFound(_))) => {
            debug!("Skipping job {}: {}", queued.job_id, e);
            return JobOutcome::NotClaimed {
                job_id: queued.job_id.clone(),
                reason: e.to_string(),
            };
        }
        Err(e) => {
            warn!("Could not claim job {}: {}", queued.job_id, e);
            return JobOutcome::NotClaimed {
                job_id: queued.job_id.clone(),
                reason: e.to_string(),
            };
        }
    };

    match runtime.block_on(pipeline.execute(&job)) {
        Ok(finished) => JobOutcome::Finished(finished),
        Err(e) => {
            error!("Outcome of job {} was not recorded: {}", job.id, e);
            JobOutcome::Untracked {
                job_id: job.id,
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobStatus, StageRequest};
    use crate::pipeline::PipelineConfig;
    use crate::test_support::{self, fakes};
    use tempfile::TempDir;

    fn pool(dir: &TempDir, workers: usize) -> (Pipeline, WorkerPool) {
        let db = test_support::seeded_db();
        let pipeline = Pipeline::new(
            db,
            fakes::toolset("The reef wakes at dawn."),
            Arc::new(PipelineConfig::with_data_directory(dir.path())),
        );
        let pool = WorkerPool::new(pipeline.clone(), workers, 4).unwrap();
        (pipeline, pool)
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = TempDir::new().unwrap();
        let db = test_support::seeded_db();
        let pipeline = Pipeline::new(
            db,
            fakes::toolset(""),
            Arc::new(PipelineConfig::with_data_directory(dir.path())),
        );
        assert!(WorkerPool::new(pipeline, 0, 4).is_err());
    }

    #[test]
    fn test_worker_runs_submitted_job() {
        let dir = TempDir::new().unwrap();
        let (pipeline, pool) = pool(&dir, 2);

        let job = pipeline
            .tracker()
            .submit("story-1", StageRequest::Story)
            .unwrap();
        pool.submit(QueuedJob::from(&job)).unwrap();

        let outcome = pool.recv_result().unwrap();
        assert_eq!(outcome.job_id(), job.id);
        assert_eq!(outcome.status(), Some(JobStatus::Completed));

        pool.shutdown();
        assert!(pool.is_shutdown());
        pool.wait();
    }

    #[test]
    fn test_duplicate_queue_entry_is_not_claimed_twice() {
        let dir = TempDir::new().unwrap();
        let (pipeline, pool) = pool(&dir, 2);

        let job = pipeline
            .tracker()
            .submit("story-1", StageRequest::Story)
            .unwrap();
        pool.submit(QueuedJob::from(&job)).unwrap();
        pool.submit(QueuedJob::from(&job)).unwrap();

        let outcomes = [pool.recv_result().unwrap(), pool.recv_result().unwrap()];
        let finished = outcomes
            .iter()
            .filter(|o| matches!(o, JobOutcome::Finished(_)))
            .count();
        assert_eq!(finished, 1);

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let dir = TempDir::new().unwrap();
        let (_pipeline, pool) = pool(&dir, 1);
        pool.shutdown();
        let queued = QueuedJob {
            job_id: "job-1".to_string(),
            subject_id: "story-1".to_string(),
            stage: crate::jobs::JobStage::Story,
        };
        assert!(matches!(pool.submit(queued), Err(WorkerError::ShuttingDown)));
        pool.wait();
    }

    #[test]
    fn test_unread_outcomes_do_not_pile_up() {
        let dir = TempDir::new().unwrap();
        let db = test_support::seeded_db();
        let pipeline = Pipeline::new(
            db,
            fakes::toolset("The reef wakes at dawn."),
            Arc::new(PipelineConfig::with_data_directory(dir.path())),
        );
        let pool = WorkerPool::new(pipeline.clone(), 1, 1).unwrap();
        let capacity = result_capacity(1, 1);

        // Nobody reads outcomes while these run one after another.
        for _ in 0..capacity + 3 {
            let job = pipeline
                .tracker()
                .submit("story-1", StageRequest::Story)
                .unwrap();
            pool.submit(QueuedJob::from(&job)).unwrap();
            let mut status = JobStatus::Pending;
            for _ in 0..500 {
                status = pipeline.tracker().get(&job.id).unwrap().status;
                if status == JobStatus::Completed {
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
            assert_eq!(status, JobStatus::Completed);
        }

        let mut buffered = 0;
        while pool.try_recv_result().is_some() {
            buffered += 1;
        }
        assert_eq!(buffered, capacity);

        pool.shutdown();
        pool.wait();
    }
}
