use std::time::Duration;

use rama::{error::OpaqueError, telemetry::tracing};
use tokio::sync::oneshot;

use super::{
    ArtifactSink, DEFAULT_SEGMENT_LENGTH, DutyCycle, FioJob, FioOutput, SegmentPlan, Workload,
};

/// Default fio file for filesystem volumes.
pub const DEFAULT_FIO_FS_FILENAME: &str = "/volume/fiotestfile";
/// Default fio file for raw block volumes.
pub const DEFAULT_FIO_BLOCK_FILENAME: &str = "/dev/sdm";

/// The files fio exercises within a pod,
/// one for filesystem volumes and one for raw block mounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FioFiles {
    pub filesystem: String,
    pub block: String,
}

impl Default for FioFiles {
    fn default() -> Self {
        Self {
            filesystem: DEFAULT_FIO_FS_FILENAME.to_owned(),
            block: DEFAULT_FIO_BLOCK_FILENAME.to_owned(),
        }
    }
}

impl FioFiles {
    pub fn select(&self, raw_block: bool) -> &str {
        if raw_block {
            &self.block
        } else {
            &self.filesystem
        }
    }
}

/// Request to run fio in a single pod for a total duration.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// name of the fio pod
    pub target: String,
    /// total time to run fio, truncated to whole seconds
    pub duration: Duration,
    pub duty_cycle: DutyCycle,
    /// false for filesystem volumes, true for raw block mounts
    pub raw_block: bool,
}

/// Terminal outcome of a [`RunRequest`].
#[derive(Debug)]
pub enum Outcome {
    /// All segments ran, carries the target name.
    Completed(String),
    /// A fio run failed, carries its error as-is.
    Failed(OpaqueError),
}

/// Runs fio in a loop of bounded segments to fulfill a larger duration,
/// which allows a soak test to terminate in a timely fashion
/// when an error occurs elsewhere.
#[derive(Debug, Clone)]
pub struct SegmentedRunner<W> {
    workload: W,
    files: FioFiles,
    segment_length: Duration,
    artifacts: ArtifactSink,
}

impl<W> SegmentedRunner<W> {
    pub fn new(workload: W) -> Self {
        Self {
            workload,
            files: FioFiles::default(),
            segment_length: DEFAULT_SEGMENT_LENGTH,
            artifacts: ArtifactSink::default(),
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the fio files used for filesystem and raw block volumes.
        pub fn files(mut self, files: FioFiles) -> Self {
            self.files = files;
            self
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the maximum duration of a single fio run.
        pub fn segment_length(mut self, segment_length: Duration) -> Self {
            self.segment_length = segment_length;
            self
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the sink receiving the raw output of every fio run.
        pub fn artifacts(mut self, artifacts: ArtifactSink) -> Self {
            self.artifacts = artifacts;
            self
        }
    }
}

impl<W: Workload> SegmentedRunner<W> {
    /// Run fio for the requested duration and signal the outcome.
    ///
    /// Exactly one of `done_tx` (with the target name) or `err_tx`
    /// (with the error of the failed fio run) receives a value,
    /// unless the duration is shorter than one second,
    /// in which case nothing runs and neither is used.
    pub async fn run(
        &self,
        request: RunRequest,
        done_tx: oneshot::Sender<String>,
        err_tx: oneshot::Sender<OpaqueError>,
    ) {
        match self.drive(&request).await {
            Some(Outcome::Completed(target)) => {
                if done_tx.send(target).is_err() {
                    tracing::debug!(pod = %request.target, "done receiver dropped");
                }
            }
            Some(Outcome::Failed(err)) => {
                if let Err(err) = err_tx.send(err) {
                    tracing::debug!(pod = %request.target, "error receiver dropped: {err}");
                }
            }
            None => (),
        }
    }

    /// Run all segments of the request, stopping at the first failed one.
    ///
    /// Returns `None` if the request has no whole second to run.
    pub async fn drive(&self, request: &RunRequest) -> Option<Outcome> {
        let RunRequest {
            target,
            duration,
            duty_cycle,
            raw_block,
        } = request;

        tracing::info!(
            pod = %target,
            ?duration,
            thinktime = duty_cycle.think_time,
            thinktime_blocks = duty_cycle.think_time_blocks,
            raw_block,
            "running fio",
        );

        let segments = SegmentPlan::new(*duration, self.segment_length);
        if segments.len() == 0 {
            tracing::warn!(pod = %target, ?duration, "no whole second to run fio for: skip");
            return None;
        }

        let fio_file = self.files.select(*raw_block);
        let extra_args = duty_cycle.fio_args();

        for (iteration, runtime) in (1u64..).zip(segments) {
            tracing::info!(
                iteration,
                pod = %target,
                duration = runtime,
                thinktime = duty_cycle.think_time,
                thinktime_blocks = duty_cycle.think_time_blocks,
                raw_block,
                fio_file,
                "run fio",
            );

            let FioOutput { output, status } = self
                .workload
                .run_fio(FioJob {
                    target: target.clone(),
                    runtime_secs: runtime,
                    filename: fio_file.to_owned(),
                    extra_args: extra_args.clone(),
                })
                .await;

            self.artifacts.store(target, &output).await;

            if let Err(err) = status {
                tracing::error!(iteration, pod = %target, "abort running fio: {err}");
                return Some(Outcome::Failed(err));
            }

            tracing::debug!(iteration, pod = %target, duration = runtime, "fio run finished");
        }

        tracing::info!(pod = %target, ?duration, "finished running fio");
        Some(Outcome::Completed(target.clone()))
    }
}

/// Wait for the single outcome signaled via the channel pair of a run.
///
/// Returns `None` if both senders are dropped without a value.
pub async fn wait_outcome(
    done_rx: oneshot::Receiver<String>,
    err_rx: oneshot::Receiver<OpaqueError>,
) -> Option<Outcome> {
    tokio::select! {
        Ok(target) = done_rx => Some(Outcome::Completed(target)),
        Ok(err) = err_rx => Some(Outcome::Failed(err)),
        else => None,
    }
}
