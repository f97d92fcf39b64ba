use std::path::{Path, PathBuf};

use rama::telemetry::tracing;

/// Best-effort sink for the raw output of the latest fio run of a pod.
///
/// Each pod has a single artifact (`<dir>/<pod>.out`),
/// overwritten by every run. Write failures are logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    dir: Option<PathBuf>,
}

impl Default for ArtifactSink {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl ArtifactSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    /// A sink which drops all output.
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Location of the artifact for the given target, if enabled.
    pub fn path_for(&self, target: &str) -> Option<PathBuf> {
        let dir = self.dir.as_deref()?;
        Some(artifact_path(dir, target))
    }

    pub async fn store(&self, target: &str, output: &[u8]) {
        let Some(path) = self.path_for(target) else {
            return;
        };
        if let Err(err) = tokio::fs::write(&path, output).await {
            tracing::debug!(
                pod = %target,
                path = %path.display(),
                "failed to write fio output artifact: {err}",
            );
        }
    }
}

fn artifact_path(dir: &Path, target: &str) -> PathBuf {
    let name: String = target
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(format!("{name}.out"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::utils::test::tmp_dir;

    #[test]
    fn test_artifact_path() {
        let dir = Path::new("/tmp");
        assert_eq!(artifact_path(dir, "fio-0"), PathBuf::from("/tmp/fio-0.out"));
        assert_eq!(
            artifact_path(dir, "../etc/passwd"),
            PathBuf::from("/tmp/.._etc_passwd.out")
        );
    }

    #[tokio::test]
    async fn test_store_overwrites() {
        let dir = tmp_dir::try_new("test_artifact_store_overwrites").unwrap();
        let sink = ArtifactSink::new(dir.clone());

        sink.store("fio-0", b"first run").await;
        sink.store("fio-0", b"second").await;

        let path = sink.path_for("fio-0").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_store_failure_is_swallowed() {
        let dir = tmp_dir::try_new("test_artifact_store_failure").unwrap();
        let sink = ArtifactSink::new(dir.join("missing").join("nested"));
        sink.store("fio-0", b"output").await;
        assert!(!sink.path_for("fio-0").unwrap().exists());
    }

    #[tokio::test]
    async fn test_disabled_sink() {
        let sink = ArtifactSink::disabled();
        assert!(sink.path_for("fio-0").is_none());
        sink.store("fio-0", b"output").await;
    }
}
