//! Job supervisor module for Slideshow Manager
//!
//! Runs at most one slideshow build at a time on a background worker and hands
//! each result back to the owning context over a channel.

use crate::images::ImageEntry;
use crate::job::{run_job, JobReport, JobResult, PipelineConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lifecycle of the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No build in flight; the next submission is accepted
    Idle,
    /// A build is in flight; submissions are rejected
    Running,
}

impl SupervisorState {
    pub fn as_str(&self) -> &str {
        match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Running => "running",
        }
    }
}

/// Returns the supervisor to `Idle` when the job's task ends, however it ends
struct RunningGuard {
    state: Arc<watch::Sender<SupervisorState>>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.state.send_replace(SupervisorState::Idle);
    }
}

/// Supervisor that owns the one-build-at-a-time rule
///
/// Rejection is the only backpressure: there is no queue, and an accepted
/// build cannot be cancelled.
pub struct JobSupervisor {
    /// Settings handed to every job
    config: Arc<PipelineConfig>,
    /// Idle/Running, shared with the in-flight job's guard
    state: Arc<watch::Sender<SupervisorState>>,
    /// Where finished jobs are delivered
    results: mpsc::UnboundedSender<JobReport>,
}

impl JobSupervisor {
    /// Create a supervisor delivering results into `results`
    pub fn new(config: PipelineConfig, results: mpsc::UnboundedSender<JobReport>) -> Self {
        let (state, _) = watch::channel(SupervisorState::Idle);
        Self {
            config: Arc::new(config),
            state: Arc::new(state),
            results,
        }
    }

    /// Create a supervisor together with the receiving end of its result channel
    pub fn with_channel(config: PipelineConfig) -> (Self, mpsc::UnboundedReceiver<JobReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(config, tx), rx)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == SupervisorState::Running
    }

    /// Wait until no build is in flight
    pub async fn wait_idle(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in self, so the channel cannot close while we wait
        let _ = rx.wait_for(|state| *state == SupervisorState::Idle).await;
    }

    /// Submit a build of `images` into `output_path`
    ///
    /// Returns false, without side effects, if a build is already running or if
    /// called outside a tokio runtime. On acceptance the worker stages, encodes,
    /// cleans up, sends a [`JobReport`] on the result channel, and only then
    /// returns the supervisor to `Idle`.
    pub fn submit(&self, images: Vec<ImageEntry>, output_path: PathBuf) -> bool {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "slideshow build submitted outside the runtime");
                return false;
            }
        };

        // Check-and-set so a late submit cannot race a completing job
        let accepted = self.state.send_if_modified(|state| {
            if *state == SupervisorState::Idle {
                *state = SupervisorState::Running;
                true
            } else {
                false
            }
        });

        if !accepted {
            warn!("slideshow creation already in progress; submission rejected");
            return false;
        }

        let guard = RunningGuard {
            state: self.state.clone(),
        };
        let job_id = Uuid::new_v4();
        let config = self.config.clone();
        let results = self.results.clone();

        info!(
            %job_id,
            images = images.len(),
            output = %output_path.display(),
            "starting slideshow creation"
        );

        handle.spawn(async move {
            let _guard = guard;

            let worker_output = output_path.clone();
            let worker = tokio::task::spawn_blocking(move || {
                run_job(&config, &images, &worker_output)
            });

            let result = match worker.await {
                Ok(result) => result,
                Err(join_err) => JobResult::SystemFailure {
                    description: format!("Slideshow worker panicked: {}", join_err),
                },
            };

            result.log(job_id);

            let report = JobReport {
                job_id,
                output_path,
                result,
            };
            if results.send(report).is_err() {
                warn!(%job_id, "result receiver dropped; report discarded");
            }

            info!(%job_id, "slideshow creation finished");
            // _guard drops here, after delivery
        });

        true
    }
}
