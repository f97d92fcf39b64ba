use std::{path::PathBuf, time::Duration};

use crate::fio::{
    ArtifactSink, DEFAULT_FIO_BLOCK_FILENAME, DEFAULT_FIO_FS_FILENAME, FioFiles, KubectlFio,
    SegmentedRunner,
};

use super::parse_humantime_str;

/// How fio is run within the soak pods.
#[derive(Debug, Clone, clap::Args)]
pub struct FioConfig {
    /// File exercised by fio in pods with a filesystem volume.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_FIO_FS_FILENAME)]
    pub fs_file: String,

    /// Device exercised by fio in pods with a raw block volume.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_FIO_BLOCK_FILENAME)]
    pub block_file: String,

    /// Maximum duration of a single fio run.
    /// Bounds how long it takes to stop a pod after a failure elsewhere.
    #[arg(
        long,
        value_name = "DURATION",
        default_value = "60s",
        value_parser = parse_humantime_str,
    )]
    pub segment_length: Duration,

    /// Directory in which the output of the last fio run of each pod is stored,
    /// defaults to the OS temp directory.
    #[arg(long, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,

    /// Do not store fio output.
    #[arg(long, default_value_t = false, conflicts_with = "artifacts")]
    pub no_artifacts: bool,

    /// kubectl program used to exec fio within the pods.
    #[arg(long, value_name = "PROGRAM", default_value = "kubectl")]
    pub kubectl: String,

    /// Namespace of the pods, defaults to the one of the current kube context.
    #[arg(long, value_name = "NAMESPACE")]
    pub namespace: Option<String>,
}

impl FioConfig {
    pub fn files(&self) -> FioFiles {
        FioFiles {
            filesystem: self.fs_file.clone(),
            block: self.block_file.clone(),
        }
    }

    pub fn artifact_sink(&self) -> ArtifactSink {
        if self.no_artifacts {
            return ArtifactSink::disabled();
        }
        match self.artifacts.clone() {
            Some(dir) => ArtifactSink::new(dir),
            None => ArtifactSink::default(),
        }
    }

    pub fn segmented_runner(&self) -> SegmentedRunner<KubectlFio> {
        let workload = KubectlFio::new(self.kubectl.clone()).with_namespace(self.namespace.clone());
        SegmentedRunner::new(workload)
            .with_files(self.files())
            .with_segment_length(self.segment_length)
            .with_artifacts(self.artifact_sink())
    }
}
