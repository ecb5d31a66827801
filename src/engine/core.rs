use std::sync::Arc;

use anyhow::Result;

use crate::analysis::{HeuristicContext, heuristic_analysis};
#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::config::{AppConfig, report_id};
use crate::data::{AnalysisProvider, CaptureData, CaptureHandle, CaptureProvider, ReportSink};
use crate::domain::{Instrument, TimeframeRole, TimeframeSpec};
use crate::models::{CombinedAnalysis, TimeframeAnalysis};
use crate::render::{RenderSurface, ZoneOverlay, plan_overlay};
use crate::strategy::{StrategyPolicy, StrategyRegistry};

use super::errors::{PipelineError, Stage, StageFailure};
use super::progress::{ProgressEvent, ProgressSink, emit};
use super::retry::{with_fallback, with_retry, with_timeout};

pub struct SignalEngine {
    /// Shared immutable configuration
    config: Arc<AppConfig>,
    strategies: StrategyRegistry,

    // Collaborators
    capture: Arc<dyn CaptureProvider>,
    analyst: Arc<dyn AnalysisProvider>,
    renderer: Arc<dyn RenderSurface>,
    reports: Arc<dyn ReportSink>,

    /// One capture session per process; concurrent runs queue here
    capture_lock: tokio::sync::Mutex<()>,
}

impl SignalEngine {
    pub fn new(
        config: Arc<AppConfig>,
        capture: Arc<dyn CaptureProvider>,
        analyst: Arc<dyn AnalysisProvider>,
        renderer: Arc<dyn RenderSurface>,
        reports: Arc<dyn ReportSink>,
    ) -> Self {
        let strategies = StrategyRegistry::from_config(&config);
        log::info!(
            "Signal engine ready: capture via {}, analysis via {}",
            capture.signature(),
            analyst.signature()
        );
        Self {
            config,
            strategies,
            capture,
            analyst,
            renderer,
            reports,
            capture_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Capture, analyze and judge both timeframes of `instrument` under `strategy_name`.
    /// The capture resource is released on every path once it has been acquired.
    pub async fn run_analysis(
        &self,
        instrument: &str,
        strategy_name: &str,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<CombinedAnalysis, PipelineError> {
        let policy =
            self.strategies
                .resolve(strategy_name)
                .ok_or_else(|| PipelineError::UnknownStrategy {
                    name: strategy_name.to_string(),
                    available: self.strategies.names().join(", "),
                })?;
        let instrument = Instrument::new(instrument);
        emit(
            progress,
            ProgressEvent::Start {
                instrument: instrument.symbol.clone(),
                strategy: policy.kind().to_string(),
            },
        );

        let _session = self.capture_lock.lock().await;

        let capture = &*self.capture;
        let limit = self.config.timeouts.capture();
        let handle = with_retry("capture init", &self.config.retry.capture, move |_| {
            with_timeout("capture init", limit, capture.initialize())
        })
        .await
        .map_err(PipelineError::CaptureFailure)?;

        let result = self
            .run_stages(policy.as_ref(), &instrument, &handle, progress)
            .await;

        if let Err(e) = self.capture.close(handle).await {
            log::warn!("Failed to release capture resource: {:#}", e);
        }

        match &result {
            Ok(combined) => {
                emit(progress, ProgressEvent::Done { valid: combined.valid });
                log::info!(
                    "{} {} finished: {}",
                    instrument.symbol,
                    policy.kind(),
                    if combined.valid { "valid" } else { "invalid" }
                );
            }
            Err(e) => log::error!("{} {} failed: {}", instrument.symbol, policy.kind(), e),
        }
        result
    }

    async fn run_stages(
        &self,
        policy: &dyn StrategyPolicy,
        instrument: &Instrument,
        handle: &CaptureHandle,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<CombinedAnalysis, PipelineError> {
        let timeframes = policy.timeframes();
        let mut failures: Vec<StageFailure> = Vec::new();

        // 1. Capture every timeframe; a miss is recorded, then judged below
        let mut captured: Vec<Option<CaptureData>> = Vec::with_capacity(timeframes.len());
        for tf in &timeframes {
            match self.capture_timeframe(handle, instrument, tf).await {
                Ok(data) => captured.push(Some(data)),
                Err(e) => {
                    failures.push(StageFailure::new(
                        Stage::Capture,
                        Some(tf.id().to_string()),
                        format!("{:#}", e),
                    ));
                    captured.push(None);
                }
            }
        }
        let missing: Vec<String> = timeframes
            .iter()
            .zip(&captured)
            .filter(|(_, data)| data.is_none())
            .map(|(tf, _)| tf.id().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::InsufficientTimeframeData { missing });
        }
        let data: Vec<CaptureData> = captured.into_iter().flatten().collect();
        emit(
            progress,
            ProgressEvent::Captured {
                timeframes: timeframes.iter().map(|tf| tf.id().to_string()).collect(),
            },
        );

        // 2. Primary, then entry with the primary as context
        let primary = match self
            .analyze_timeframe(policy, instrument, TimeframeRole::Primary, &data[0], None, progress)
            .await
        {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                failures.push(StageFailure::new(
                    Stage::Analysis,
                    Some(timeframes[0].id().to_string()),
                    format!("{:#}", e),
                ));
                None
            }
        };
        let entry = match &primary {
            Some(primary) => match self
                .analyze_timeframe(
                    policy,
                    instrument,
                    TimeframeRole::Entry,
                    &data[1],
                    Some(primary),
                    progress,
                )
                .await
            {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    failures.push(StageFailure::new(
                        Stage::Analysis,
                        Some(timeframes[1].id().to_string()),
                        format!("{:#}", e),
                    ));
                    None
                }
            },
            None => {
                log::warn!("Skipping {} analysis: primary analysis unavailable", timeframes[1]);
                None
            }
        };
        let (Some(primary), Some(entry)) = (primary, entry) else {
            let detail = failures
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(PipelineError::AnalysisFailure(detail));
        };

        // 3. Verdict
        let mut combined = policy.combine(primary, entry);
        for failure in failures {
            combined.artifacts.push_failure(failure);
        }
        for raw in data.iter().filter_map(CaptureData::raw_artifact) {
            combined.artifacts.push_raw(raw.to_path_buf());
        }

        // 4. Overlays, only for setups worth looking at
        if combined.valid {
            self.render_zones(&mut combined, instrument, &timeframes, &data, progress)
                .await;
        }

        // 5. Snapshot
        let id = report_id(&instrument.symbol, &combined.strategy, &combined.created_at);
        match self.reports.save(&id, &combined).await {
            Ok(path) => combined.artifacts.set_report_path(path),
            Err(e) => {
                log::error!("Failed to persist report {}: {:#}", id, e);
                combined.artifacts.push_failure(StageFailure::new(
                    Stage::Persistence,
                    None,
                    format!("{:#}", e),
                ));
            }
        }

        Ok(combined)
    }

    async fn capture_timeframe(
        &self,
        handle: &CaptureHandle,
        instrument: &Instrument,
        tf: &TimeframeSpec,
    ) -> Result<CaptureData> {
        let label = format!("capture {} {}", instrument.symbol, tf.id());
        let label = label.as_str();
        let capture = &*self.capture;
        let limit = self.config.timeouts.capture();
        with_retry(label, &self.config.retry.capture, move |_| {
            with_timeout(label, limit, capture.capture(handle, instrument, tf))
        })
        .await
    }

    /// AI call (retry + timeout), schema check, then the heuristic if the AI path failed
    async fn analyze_timeframe(
        &self,
        policy: &dyn StrategyPolicy,
        instrument: &Instrument,
        role: TimeframeRole,
        data: &CaptureData,
        context: Option<&TimeframeAnalysis>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<TimeframeAnalysis> {
        let tf = policy.timeframe(role);
        emit(
            progress,
            ProgressEvent::Analyzing {
                timeframe: tf.id().to_string(),
                role: role.name(),
            },
        );

        let prompt = policy.build_prompt(role, instrument, context)?;
        #[cfg(debug_assertions)]
        if DEBUG_FLAGS.print_prompts {
            log::info!("Prompt for {} {}:\n{}", instrument.symbol, tf.id(), prompt);
        }

        let label = format!("AI analysis {} {}", instrument.symbol, tf.id());
        let (label, prompt) = (label.as_str(), prompt.as_str());
        let analyst = &*self.analyst;
        let limit = self.config.timeouts.analysis();
        let policy_retry = &self.config.retry.analysis;
        let tf_ref = &tf;

        // Schema rejections count as a failed attempt, same as transport errors
        let ai = with_retry(label, policy_retry, move |_| async move {
            let value = with_timeout(label, limit, analyst.analyze(data, prompt)).await?;
            let analysis = TimeframeAnalysis::from_response(value, instrument, tf_ref)?;
            Ok::<_, anyhow::Error>(analysis)
        });

        let heuristic = HeuristicContext {
            instrument,
            timeframe: &tf,
            role,
            parent: context,
            confidence: self.config.fallback.confidence,
            geometry: &self.config.geometry,
        };
        with_fallback(
            label,
            ai,
            || heuristic_analysis(data, &heuristic),
            self.config.fallback.enabled,
        )
        .await
    }

    async fn render_zones(
        &self,
        combined: &mut CombinedAnalysis,
        instrument: &Instrument,
        timeframes: &[TimeframeSpec; 2],
        data: &[CaptureData],
        progress: Option<&dyn ProgressSink>,
    ) {
        let overlays: Vec<_> = combined
            .zones()
            .into_iter()
            .filter_map(|(tf, zone)| {
                let idx = timeframes.iter().position(|spec| spec.id() == tf)?;
                Some((idx, plan_overlay(instrument, tf, zone)))
            })
            .collect();

        emit(
            progress,
            ProgressEvent::Rendering {
                overlays: overlays.len(),
            },
        );

        // One fresh image per timeframe surface, in timeframe order
        for (idx, spec) in timeframes.iter().enumerate() {
            let batch: Vec<ZoneOverlay> = overlays
                .iter()
                .filter(|(i, _)| *i == idx)
                .map(|(_, overlay)| overlay.clone())
                .collect();
            if batch.is_empty() {
                continue;
            }
            match self.renderer.render_overlays(&data[idx], &batch).await {
                Ok(path) => combined.artifacts.push_rendered(path),
                Err(e) => {
                    log::warn!("Rendering {} {} failed: {:#}", instrument.symbol, spec.id(), e);
                    combined.artifacts.push_failure(StageFailure::new(
                        Stage::Rendering,
                        Some(spec.id().to_string()),
                        format!("{:#}", e),
                    ));
                }
            }
        }
    }
}
