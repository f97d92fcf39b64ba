use rama::error::{ErrorContext as _, OpaqueError};
use serde::Serialize;

/// Summary of a soak run in which all pods finished.
#[derive(Debug, Serialize)]
pub(super) struct SoakReport {
    pub(super) pods: Vec<String>,
    pub(super) duration_secs: u64,
    pub(super) elapsed_secs: f64,
}

impl SoakReport {
    pub(super) fn print(&self, json: bool) -> Result<(), OpaqueError> {
        println!("{}", self.render(json)?);
        Ok(())
    }

    fn render(&self, json: bool) -> Result<String, OpaqueError> {
        if json {
            return Ok(serde_json::to_string(self).context("json encode soak report")?);
        }

        Ok(format!(
            "✅ fio ran for {}s in {} pod(s) ({}), elapsed: {:.1}s",
            self.duration_secs,
            self.pods.len(),
            self.pods.join(", "),
            self.elapsed_secs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> SoakReport {
        SoakReport {
            pods: vec!["fio-0".to_owned(), "fio-1".to_owned()],
            duration_secs: 150,
            elapsed_secs: 151.25,
        }
    }

    #[test]
    fn test_render_json() {
        let value: serde_json::Value =
            serde_json::from_str(&report().render(true).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "pods": ["fio-0", "fio-1"],
                "duration_secs": 150,
                "elapsed_secs": 151.25,
            })
        );
    }

    #[test]
    fn test_render_human() {
        let text = report().render(false).unwrap();
        assert!(text.contains("150s"), "{text}");
        assert!(text.contains("2 pod(s) (fio-0, fio-1)"), "{text}");
        assert!(text.contains("151.2s") || text.contains("151.3s"), "{text}");
    }
}
