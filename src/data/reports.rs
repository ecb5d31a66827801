use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::models::CombinedAnalysis;

/// Persists a run's verdict and returns where it went
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn save(&self, report_id: &str, report: &CombinedAnalysis) -> Result<PathBuf>;
}

/// Pretty JSON snapshots, one file per run
pub struct JsonReportSink {
    dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ReportSink for JsonReportSink {
    async fn save(&self, report_id: &str, report: &CombinedAnalysis) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context(format!("Failed to create directory: {}", self.dir.display()))?;
        let path = self.dir.join(format!("{}.json", report_id));
        let json = serde_json::to_vec_pretty(report)
            .context(format!("Failed to serialize report {}", report_id))?;
        tokio::fs::write(&path, json)
            .await
            .context(format!("Failed to write report: {}", path.display()))?;
        log::info!("Report saved to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TimeframeAnalysis, ValidationReport};

    #[tokio::test]
    async fn test_report_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonReportSink::new(dir.path().join("reports"));
        let report = CombinedAnalysis::new(
            "EURUSD",
            "swing",
            false,
            0.5,
            TimeframeAnalysis::default(),
            TimeframeAnalysis::default(),
            ValidationReport::new().finish(),
            ValidationReport::new().finish(),
            vec!["30: containment".to_string()],
            vec![],
        );
        let path = sink.save("EURUSD_swing_test", &report).await.unwrap();
        assert_eq!(path, dir.path().join("reports").join("EURUSD_swing_test.json"));

        let text = std::fs::read_to_string(&path).unwrap();
        let back: CombinedAnalysis = serde_json::from_str(&text).unwrap();
        assert_eq!(back.errors, report.errors);
        assert!(!back.valid);
    }
}
