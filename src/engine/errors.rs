use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failures of a run. Everything else is recorded on the result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown strategy '{name}' (available: {available})")]
    UnknownStrategy { name: String, available: String },

    #[error("capture failed: {0:#}")]
    CaptureFailure(anyhow::Error),

    #[error("analysis failed: {0}")]
    AnalysisFailure(String),

    #[error("insufficient timeframe data: missing {}", missing.join(", "))]
    InsufficientTimeframeData { missing: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Capture,
    Analysis,
    Rendering,
    Persistence,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Stage::Capture => "capture",
            Stage::Analysis => "analysis",
            Stage::Rendering => "rendering",
            Stage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// A non-terminal failure kept on the run's artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub timeframe: Option<String>,
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: Stage, timeframe: Option<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            timeframe,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.timeframe {
            Some(tf) => write!(f, "{} [{}]: {}", self.stage, tf, self.message),
            None => write!(f, "{}: {}", self.stage, self.message),
        }
    }
}
