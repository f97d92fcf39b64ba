// Run a single bounded fio job against a pod.

use std::{fmt, pin::Pin, process::Stdio, sync::Arc};

use rama::{error::OpaqueError, telemetry::tracing};
use tokio::process::Command;

/// A single bounded fio run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FioJob {
    /// name of the pod running fio
    pub target: String,
    /// time in seconds to run fio
    pub runtime_secs: u64,
    /// file (or block device) fio exercises
    pub filename: String,
    /// extra `--key=value` fio arguments
    pub extra_args: Vec<String>,
}

/// Captured result of a [`FioJob`].
///
/// The output is kept even when the job failed.
#[derive(Debug)]
pub struct FioOutput {
    pub output: Vec<u8>,
    pub status: Result<(), OpaqueError>,
}

impl FioOutput {
    pub fn ok(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            status: Ok(()),
        }
    }

    pub fn failed(output: impl Into<Vec<u8>>, err: OpaqueError) -> Self {
        Self {
            output: output.into(),
            status: Err(err),
        }
    }
}

pub trait Workload: fmt::Debug + Sized + Send + Sync + 'static {
    fn run_fio(&self, job: FioJob) -> impl Future<Output = FioOutput> + Send + '_;

    /// Converts this [`Workload`] into a [`BoxWorkload`] trait object.
    fn into_dyn(self) -> BoxWorkload {
        BoxWorkload(Arc::new(self))
    }
}

#[derive(Debug, Clone)]
pub struct BoxWorkload(Arc<dyn DynWorkload + Send + Sync + 'static>);

impl Workload for BoxWorkload {
    #[inline(always)]
    async fn run_fio(&self, job: FioJob) -> FioOutput {
        self.0.dyn_run_fio(job).await
    }

    fn into_dyn(self) -> BoxWorkload {
        self
    }
}

/// Internal trait for dynamic dispatch of Async Traits,
/// implemented according to the pioneers of this Design Pattern
/// found at <https://rust-lang.github.io/async-fundamentals-initiative/evaluation/case-studies/builder-provider-api.html#dynamic-dispatch-behind-the-api>
/// and widely published at <https://blog.rust-lang.org/inside-rust/2023/05/03/stabilizing-async-fn-in-trait.html>.
pub trait DynWorkload: fmt::Debug {
    fn dyn_run_fio(&self, job: FioJob) -> Pin<Box<dyn Future<Output = FioOutput> + Send + '_>>;
}

impl<W: Workload> DynWorkload for W {
    #[inline(always)]
    /// see [`Workload::run_fio`] for more information.
    fn dyn_run_fio(&self, job: FioJob) -> Pin<Box<dyn Future<Output = FioOutput> + Send + '_>> {
        Box::pin(self.run_fio(job))
    }
}

/// Fixed fio arguments used for every soak run,
/// a random read-write mix with crc32 verification.
const FIO_BASE_ARGS: &[&str] = &[
    "--name=benchtest",
    "--verify_fatal=1",
    "--verify=crc32",
    "--direct=1",
    "--rw=randrw",
    "--ioengine=libaio",
    "--bs=4k",
    "--iodepth=16",
    "--numjobs=1",
    "--time_based",
];

/// Runs fio inside a pod using `kubectl exec`.
#[derive(Debug, Clone)]
pub struct KubectlFio {
    program: String,
    namespace: Option<String>,
}

impl Default for KubectlFio {
    fn default() -> Self {
        Self::new("kubectl")
    }
}

impl KubectlFio {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            namespace: None,
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Run the pods in the given namespace instead of the current kube context one.
        pub fn namespace(mut self, namespace: Option<String>) -> Self {
            self.namespace = namespace;
            self
        }
    }

    fn args(&self, job: &FioJob) -> Vec<String> {
        let mut args = Vec::with_capacity(FIO_BASE_ARGS.len() + job.extra_args.len() + 8);
        if let Some(namespace) = self.namespace.as_deref() {
            args.push("--namespace".to_owned());
            args.push(namespace.to_owned());
        }
        args.extend([
            "exec".to_owned(),
            job.target.clone(),
            "--".to_owned(),
            "fio".to_owned(),
        ]);
        args.extend(FIO_BASE_ARGS.iter().map(|s| (*s).to_owned()));
        args.push(format!("--filename={}", job.filename));
        args.push(format!("--runtime={}", job.runtime_secs));
        args.extend(job.extra_args.iter().cloned());
        args
    }
}

impl Workload for KubectlFio {
    async fn run_fio(&self, job: FioJob) -> FioOutput {
        let args = self.args(&job);
        tracing::debug!(
            program = %self.program,
            pod = %job.target,
            ?args,
            "spawn fio process",
        );

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                return FioOutput::failed(
                    Vec::new(),
                    OpaqueError::from_display(format!(
                        "spawn fio process using '{}': {err}",
                        self.program
                    )),
                );
            }
        };

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        if output.status.success() {
            FioOutput::ok(combined)
        } else {
            FioOutput::failed(
                combined,
                OpaqueError::from_display(format!(
                    "fio in pod '{}' exited with {}",
                    job.target, output.status
                )),
            )
        }
    }
}
