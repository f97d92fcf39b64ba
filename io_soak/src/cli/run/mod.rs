use std::{collections::HashSet, path::PathBuf, sync::Arc, time::Duration};

use clap::Args;
use rama::{
    error::{ErrorContext as _, OpaqueError},
    graceful::ShutdownGuard,
    telemetry::tracing,
};
use tokio::{sync::oneshot, task::JoinSet, time::Instant};

use crate::{
    config::{FioConfig, parse_humantime_str},
    fio::{
        DEFAULT_DUTY_CYCLES, DutyCycle, Outcome, RunRequest, load_duty_cycles, parse_duty_cycle,
        wait_outcome,
    },
};

mod report;

use self::report::SoakReport;

#[derive(Debug, Clone, Args)]
/// run fio in all given pods for a total duration,
/// aborting all of them as soon as one fails
pub struct RunCommand {
    /// Pod with a filesystem volume to run fio in.
    #[arg(long = "pod", value_name = "POD")]
    pods: Vec<String>,

    /// Pod with a raw block volume to run fio in.
    #[arg(long = "raw-block-pod", value_name = "POD")]
    raw_block_pods: Vec<String>,

    /// Total duration to run fio for in every pod (e.g. "2h", "1h_30m").
    /// Sub-second precision is dropped.
    #[arg(long, value_name = "DURATION", value_parser = parse_humantime_str)]
    duration: Duration,

    /// Use this duty cycle (`<thinktime usecs>:<thinktime_blocks>`) for all pods
    /// instead of assigning them round-robin from the duty cycle table.
    #[arg(long, value_name = "THINKTIME:BLOCKS", value_parser = parse_duty_cycle)]
    duty_cycle: Option<DutyCycle>,

    /// JSON file with the duty cycle table to use instead of the built-in one.
    #[arg(long, value_name = "FILE", conflicts_with = "duty_cycle")]
    duty_cycles: Option<PathBuf>,

    /// report json instead of a human-friendly format
    #[arg(long, default_value_t = false)]
    json: bool,

    #[clap(flatten)]
    fio: FioConfig,
}

pub async fn exec(guard: ShutdownGuard, args: RunCommand) -> Result<(), OpaqueError> {
    if args.duration < Duration::from_secs(1) {
        return Err(OpaqueError::from_display(
            "soak duration has to be at least one second",
        ));
    }

    let duty_cycles = match (args.duty_cycle, args.duty_cycles) {
        (Some(duty_cycle), _) => vec![duty_cycle],
        (None, Some(path)) => load_duty_cycles(path)
            .await
            .context("load duty cycle table")?,
        (None, None) => DEFAULT_DUTY_CYCLES.to_vec(),
    };

    let requests = soak_requests(
        args.pods,
        args.raw_block_pods,
        args.duration,
        &duty_cycles,
    )?;

    let runner = Arc::new(args.fio.segmented_runner());

    tracing::info!(
        pods = requests.len(),
        duration = ?args.duration,
        segment_length = ?args.fio.segment_length,
        duty_cycles = duty_cycles.len(),
        "start fio soak",
    );

    let start = Instant::now();

    let mut runners = JoinSet::new();
    let mut outcomes = JoinSet::new();

    for request in requests {
        let (done_tx, done_rx) = oneshot::channel();
        let (err_tx, err_rx) = oneshot::channel();

        let target = request.target.clone();
        let runner = runner.clone();

        runners.spawn(async move { runner.run(request, done_tx, err_tx).await });
        outcomes.spawn(async move { (target, wait_outcome(done_rx, err_rx).await) });
    }

    let mut cancelled = std::pin::pin!(guard.clone_weak().into_cancelled());
    let mut finished = Vec::with_capacity(outcomes.len());

    loop {
        let (target, outcome) = tokio::select! {
            _ = cancelled.as_mut() => {
                tracing::error!("exit fio soak early: guard shutdown");
                runners.abort_all();
                return Err(OpaqueError::from_display("fio soak aborted by shutdown"));
            }
            maybe_outcome = outcomes.join_next() => {
                let Some(result) = maybe_outcome else {
                    tracing::debug!("all fio runners finished");
                    break;
                };

                result.context("join fio outcome task")?
            }
        };

        match outcome {
            Some(Outcome::Completed(pod)) => {
                tracing::info!(
                    %pod,
                    remaining = outcomes.len(),
                    "fio soak finished for pod",
                );
                finished.push(pod);
            }
            Some(Outcome::Failed(err)) => {
                tracing::error!(pod = %target, "fio soak failed: {err}; abort all runners");
                runners.abort_all();
                return Err(OpaqueError::from_display(format!(
                    "fio failed in pod '{target}': {err}"
                )));
            }
            None => {
                runners.abort_all();
                return Err(OpaqueError::from_display(format!(
                    "fio runner for pod '{target}' stopped without outcome"
                )));
            }
        }
    }

    SoakReport {
        pods: finished,
        duration_secs: args.duration.as_secs(),
        elapsed_secs: start.elapsed().as_secs_f64(),
    }
    .print(args.json)
}

/// Create one [`RunRequest`] per pod, with duty cycles assigned round-robin.
fn soak_requests(
    pods: Vec<String>,
    raw_block_pods: Vec<String>,
    duration: Duration,
    duty_cycles: &[DutyCycle],
) -> Result<Vec<RunRequest>, OpaqueError> {
    if duty_cycles.is_empty() {
        return Err(OpaqueError::from_display("no duty cycles defined"));
    }

    let targets: Vec<_> = pods
        .into_iter()
        .map(|pod| (pod, false))
        .chain(raw_block_pods.into_iter().map(|pod| (pod, true)))
        .collect();
    if targets.is_empty() {
        return Err(OpaqueError::from_display(
            "no pods defined: use --pod and/or --raw-block-pod",
        ));
    }

    let mut seen = HashSet::with_capacity(targets.len());
    for (pod, _) in &targets {
        if pod.trim().is_empty() {
            return Err(OpaqueError::from_display("empty pod name is not allowed"));
        }
        if !seen.insert(pod.as_str()) {
            return Err(OpaqueError::from_display(format!(
                "pod '{pod}' is defined more than once"
            )));
        }
    }

    Ok(targets
        .into_iter()
        .enumerate()
        .map(|(ix, (target, raw_block))| RunRequest {
            target,
            duration,
            duty_cycle: duty_cycles[ix % duty_cycles.len()],
            raw_block,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pods(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_soak_requests_round_robin() {
        let requests = soak_requests(
            pods(&["a", "b", "c"]),
            pods(&["d"]),
            Duration::from_secs(600),
            &DEFAULT_DUTY_CYCLES[..2],
        )
        .unwrap();

        let summary: Vec<_> = requests
            .iter()
            .map(|r| (r.target.as_str(), r.raw_block, r.duty_cycle))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a", false, DEFAULT_DUTY_CYCLES[0]),
                ("b", false, DEFAULT_DUTY_CYCLES[1]),
                ("c", false, DEFAULT_DUTY_CYCLES[0]),
                ("d", true, DEFAULT_DUTY_CYCLES[1]),
            ]
        );
        assert!(
            requests
                .iter()
                .all(|r| r.duration == Duration::from_secs(600))
        );
    }

    #[test]
    fn test_soak_requests_pinned_duty_cycle() {
        let pinned = DutyCycle::new(1, 1).unwrap();
        let requests = soak_requests(
            pods(&["a", "b"]),
            vec![],
            Duration::from_secs(60),
            &[pinned],
        )
        .unwrap();
        assert!(requests.iter().all(|r| r.duty_cycle == pinned));
    }

    #[test]
    fn test_soak_requests_invalid() {
        let duration = Duration::from_secs(60);
        assert!(soak_requests(vec![], vec![], duration, DEFAULT_DUTY_CYCLES).is_err());
        assert!(soak_requests(pods(&["a"]), vec![], duration, &[]).is_err());
        assert!(soak_requests(pods(&["a"]), pods(&["a"]), duration, DEFAULT_DUTY_CYCLES).is_err());
        assert!(soak_requests(pods(&[" "]), vec![], duration, DEFAULT_DUTY_CYCLES).is_err());
    }

    #[cfg(target_family = "unix")]
    #[tokio::test]
    async fn test_exec_all_pods_finish() {
        use clap::Parser;

        #[derive(Debug, Parser)]
        struct TestArgs {
            #[clap(flatten)]
            run: RunCommand,
        }

        let args = TestArgs::try_parse_from([
            "test",
            "--pod",
            "fio-0",
            "--raw-block-pod",
            "fio-1",
            "--duration",
            "2s",
            "--segment-length",
            "1s",
            "--kubectl",
            "true",
            "--no-artifacts",
        ])
        .unwrap();

        let shutdown = rama::graceful::Shutdown::new(std::future::pending::<()>());
        let (result_tx, result_rx) = oneshot::channel();
        shutdown.spawn_task_fn(async move |guard| {
            let _ = result_tx.send(exec(guard, args.run).await);
        });
        result_rx.await.unwrap().unwrap();
    }

    #[cfg(target_family = "unix")]
    #[tokio::test]
    async fn test_exec_failure_aborts() {
        use clap::Parser;

        #[derive(Debug, Parser)]
        struct TestArgs {
            #[clap(flatten)]
            run: RunCommand,
        }

        let args = TestArgs::try_parse_from([
            "test",
            "--pod",
            "fio-0",
            "--pod",
            "fio-1",
            "--duration",
            "1h",
            "--kubectl",
            "false",
            "--no-artifacts",
        ])
        .unwrap();

        let shutdown = rama::graceful::Shutdown::new(std::future::pending::<()>());
        let (result_tx, result_rx) = oneshot::channel();
        shutdown.spawn_task_fn(async move |guard| {
            let _ = result_tx.send(exec(guard, args.run).await);
        });
        let err = result_rx.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("fio failed in pod"), "{err}");
    }
}
