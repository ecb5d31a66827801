#![allow(clippy::type_complexity)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod geometry;
pub mod models;
pub mod render;
pub mod strategy;
pub mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

// Re-export commonly used types
pub use config::AppConfig;
pub use domain::{Instrument, InstrumentClass, TimeframeSpec};
pub use engine::{PipelineError, ProgressEvent, ProgressSink, SignalEngine};
pub use geometry::{BandPlacement, ChartRect, map_price_range_to_pixels};
pub use models::{CombinedAnalysis, TimeframeAnalysis, ValidationResult};
pub use strategy::{StrategyKind, StrategyPolicy, StrategyRegistry};

use data::{
    AnalysisProvider, CaptureProvider, ChatCompletionsProvider, JsonReportSink, OfflineProvider,
    ScreenshotDirCapture, SeriesFileCapture,
};
use render::SvgRenderer;

// CLI argument parsing
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON file overriding the built-in configuration
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one analysis and print the verdict
    Analyze {
        instrument: String,

        #[arg(long, default_value = "swing")]
        strategy: String,

        #[command(flatten)]
        run: RunOptions,
    },
    /// List strategies and their timeframes
    Strategies,
    /// List configured instruments
    Instruments,
    /// Choose market, pair and strategy step by step, then analyze
    Interactive {
        #[command(flatten)]
        run: RunOptions,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Where charts come from
    #[arg(long, value_enum, default_value_t = SourceKind::Series)]
    pub source: SourceKind,

    /// Capture directory (defaults to the configured one)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Heuristic analysis only, single attempt, no network
    #[arg(long, default_value_t = false)]
    pub offline: bool,

    /// Print the full report instead of the summary
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    /// OHLCV series files (`SYMBOL_tf.json` / `.bin`)
    #[default]
    Series,
    /// Chart screenshots with calibration sidecars
    Screenshots,
}

/// Wire the configured collaborators into an engine
pub fn build_engine(config: &AppConfig, run: &RunOptions) -> Result<SignalEngine> {
    let mut config = config.clone();
    let analyst: Arc<dyn AnalysisProvider> = if run.offline {
        config.retry.analysis = config.retry.analysis.single_attempt();
        config.fallback.enabled = true;
        Arc::new(OfflineProvider)
    } else {
        Arc::new(ChatCompletionsProvider::new(config.provider.clone())?)
    };

    let data_dir = run
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.persistence.capture_dir));
    let capture: Arc<dyn CaptureProvider> = match run.source {
        SourceKind::Series => Arc::new(SeriesFileCapture::new(data_dir)),
        SourceKind::Screenshots => Arc::new(ScreenshotDirCapture::new(data_dir)),
    };

    let renderer = Arc::new(SvgRenderer::new(
        &config.persistence.renders_dir,
        config.geometry,
    ));
    let reports = Arc::new(JsonReportSink::new(&config.persistence.reports_dir));

    Ok(SignalEngine::new(
        Arc::new(config),
        capture,
        analyst,
        renderer,
        reports,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_arguments() {
        let cli = Cli::try_parse_from([
            "signal-sniper",
            "analyze",
            "EURUSD",
            "--strategy",
            "scalping",
            "--offline",
            "--data-dir",
            "/tmp/charts",
            "--config",
            "custom.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.json")));
        match cli.command {
            Command::Analyze {
                instrument,
                strategy,
                run,
            } => {
                assert_eq!(instrument, "EURUSD");
                assert_eq!(strategy, "scalping");
                assert!(run.offline);
                assert!(!run.json);
                assert_eq!(run.source, SourceKind::Series);
                assert_eq!(run.data_dir, Some(PathBuf::from("/tmp/charts")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_source_and_unknown_subcommand() {
        let cli =
            Cli::try_parse_from(["signal-sniper", "interactive", "--source", "screenshots"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Interactive {
                run: RunOptions {
                    source: SourceKind::Screenshots,
                    ..
                }
            }
        ));
        assert!(Cli::try_parse_from(["signal-sniper", "trade"]).is_err());
    }

    #[test]
    fn test_offline_engine_uses_single_attempt() {
        let run = RunOptions {
            offline: true,
            ..Default::default()
        };
        let engine = build_engine(&AppConfig::default(), &run).unwrap();
        assert_eq!(engine.config().retry.analysis.attempts(), 1);
        assert!(engine.config().fallback.enabled);
        assert_eq!(engine.strategies().names(), vec!["swing", "scalping"]);
    }
}
