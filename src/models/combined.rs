use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::REPORT_VERSION;
use crate::engine::errors::StageFailure;
use crate::geometry::VisibleRange;
use crate::models::analysis::{Signal, TimeframeAnalysis, Trend, ZoneType};
use crate::models::validation::ValidationResult;

/// Colour role of an overlay; resolved to hex by the renderer's palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneColor {
    Support,
    Resistance,
    Entry,
    Neutral,
}

/// A price band to draw. Always satisfies `price_high > price_low`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDescriptor {
    pub price_high: f64,
    pub price_low: f64,
    pub zone_type: Option<ZoneType>,
    pub color_hint: ZoneColor,
    pub visible_range: Option<VisibleRange>,
    pub label: String,
}

impl ZoneDescriptor {
    /// Orders the bounds; None when they are equal or not finite
    pub fn from_bounds(
        a: f64,
        b: f64,
        zone_type: Option<ZoneType>,
        color_hint: ZoneColor,
        label: impl Into<String>,
    ) -> Option<Self> {
        if !a.is_finite() || !b.is_finite() || a == b {
            return None;
        }
        Some(ZoneDescriptor {
            price_high: a.max(b),
            price_low: a.min(b),
            zone_type,
            color_hint,
            visible_range: None,
            label: label.into(),
        })
    }

    /// Build from a timeframe's own bounds, carrying its visible range if it reported one
    pub fn for_analysis(analysis: &TimeframeAnalysis, is_entry: bool) -> Option<Self> {
        let (high, low) = analysis.zone_bounds()?;
        let color = if is_entry {
            ZoneColor::Entry
        } else {
            match analysis.zone_type {
                Some(ZoneType::Support) => ZoneColor::Support,
                Some(ZoneType::Resistance) => ZoneColor::Resistance,
                _ => ZoneColor::Neutral,
            }
        };
        let kind = analysis
            .zone_type
            .as_ref()
            .map(|z| z.as_str().to_string())
            .unwrap_or_else(|| "zone".to_string());
        let label = format!("{} {} {}", analysis.timeframe, kind, if is_entry { "entry" } else { "" })
            .trim()
            .to_string();

        let mut descriptor =
            ZoneDescriptor::from_bounds(high, low, analysis.zone_type.clone(), color, label)?;
        descriptor.visible_range = analysis
            .visible_range()
            .map(|(high, low)| VisibleRange { high, low });
        Some(descriptor)
    }

    pub fn width(&self) -> f64 {
        self.price_high - self.price_low
    }
}

/// Side outputs of a run. Append-only after the verdict is formed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunArtifacts {
    rendered_images: Vec<PathBuf>,
    raw_images: Vec<PathBuf>,
    report_path: Option<PathBuf>,
    failures: Vec<StageFailure>,
}

impl RunArtifacts {
    pub fn push_rendered(&mut self, path: PathBuf) {
        self.rendered_images.push(path);
    }

    pub fn push_raw(&mut self, path: PathBuf) {
        self.raw_images.push(path);
    }

    /// First write wins
    pub fn set_report_path(&mut self, path: PathBuf) {
        if self.report_path.is_none() {
            self.report_path = Some(path);
        }
    }

    pub fn push_failure(&mut self, failure: StageFailure) {
        self.failures.push(failure);
    }

    pub fn rendered_images(&self) -> &[PathBuf] {
        &self.rendered_images
    }

    pub fn raw_images(&self) -> &[PathBuf] {
        &self.raw_images
    }

    pub fn report_path(&self) -> Option<&PathBuf> {
        self.report_path.as_ref()
    }

    pub fn failures(&self) -> &[StageFailure] {
        &self.failures
    }
}

/// Final verdict of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedAnalysis {
    pub version: f64,
    pub instrument: String,
    pub strategy: String,
    pub created_at: DateTime<Utc>,

    pub valid: bool,
    pub signal: Option<Signal>,
    pub trend: Option<Trend>,
    pub pattern: Option<String>,
    pub confidence: f64,

    pub primary_zone: Option<ZoneDescriptor>,
    pub entry_zone: Option<ZoneDescriptor>,

    pub primary: TimeframeAnalysis,
    pub entry: TimeframeAnalysis,
    pub primary_validation: ValidationResult,
    pub entry_validation: ValidationResult,

    pub errors: Vec<String>,
    pub warnings: Vec<String>,

    pub artifacts: RunArtifacts,
}

impl CombinedAnalysis {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        instrument: &str,
        strategy: &str,
        valid: bool,
        confidence: f64,
        primary: TimeframeAnalysis,
        entry: TimeframeAnalysis,
        primary_validation: ValidationResult,
        entry_validation: ValidationResult,
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        CombinedAnalysis {
            version: REPORT_VERSION,
            instrument: instrument.to_string(),
            strategy: strategy.to_string(),
            created_at: Utc::now(),
            valid,
            signal: primary.signal.clone(),
            trend: primary.trend.clone(),
            pattern: primary.pattern.clone(),
            confidence,
            primary_zone: ZoneDescriptor::for_analysis(&primary, false),
            entry_zone: ZoneDescriptor::for_analysis(&entry, true),
            primary,
            entry,
            primary_validation,
            entry_validation,
            errors,
            warnings,
            artifacts: RunArtifacts::default(),
        }
    }

    /// Zones to draw, paired with the timeframe they belong to
    pub fn zones(&self) -> Vec<(&str, &ZoneDescriptor)> {
        let mut zones = Vec::new();
        if let Some(zone) = &self.primary_zone {
            zones.push((self.primary.timeframe.as_str(), zone));
        }
        if let Some(zone) = &self.entry_zone {
            zones.push((self.entry.timeframe.as_str(), zone));
        }
        zones
    }

    pub fn used_fallback(&self) -> bool {
        self.primary.is_fallback() || self.entry.is_fallback()
    }

    /// Plain-text message for the delivery channel
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let verdict = if self.valid { "VALID SETUP" } else { "NO VALID SETUP" };
        let _ = writeln!(
            out,
            "{} {} ({}) - {}",
            self.instrument,
            self.strategy,
            self.created_at.format("%Y-%m-%d %H:%M UTC"),
            verdict
        );

        let label = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "Signal: {} | Trend: {} | Pattern: {} | Confidence: {:.0}%",
            label(self.signal.as_ref().map(|s| s.to_string())),
            label(self.trend.as_ref().map(|t| t.to_string())),
            label(self.pattern.clone()),
            self.confidence * 100.0
        );
        let zones = [
            ("Primary zone", &self.primary_zone),
            ("Entry zone", &self.entry_zone),
        ];
        for (name, zone) in zones {
            if let Some(zone) = zone {
                let _ = writeln!(out, "{}: {} - {}", name, zone.price_low, zone.price_high);
            }
        }
        if self.used_fallback() {
            let _ = writeln!(out, "Note: offline heuristic used, levels are approximate");
        }
        for error in &self.errors {
            let _ = writeln!(out, "Error: {}", error);
        }
        for warning in &self.warnings {
            let _ = writeln!(out, "Warning: {}", warning);
        }
        for failure in self.artifacts.failures() {
            let _ = writeln!(out, "Stage failure: {}", failure);
        }
        if let Some(path) = self.artifacts.report_path() {
            let _ = writeln!(out, "Report: {}", path.display());
        }
        for path in self.artifacts.rendered_images() {
            let _ = writeln!(out, "Chart: {}", path.display());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::errors::Stage;
    use crate::models::validation::ValidationReport;

    fn analysis(tf: &str, high: f64, low: f64) -> TimeframeAnalysis {
        TimeframeAnalysis {
            instrument: "EURUSD".to_string(),
            timeframe: tf.to_string(),
            zone_type: Some(ZoneType::Support),
            zone_high: Some(high),
            zone_low: Some(low),
            signal: Some(Signal::Buy),
            ..Default::default()
        }
    }

    #[test]
    fn test_descriptor_orders_bounds_and_rejects_collapsed() {
        let d = ZoneDescriptor::from_bounds(1.0, 2.0, None, ZoneColor::Neutral, "z").unwrap();
        assert_eq!((d.price_high, d.price_low), (2.0, 1.0));
        assert!(ZoneDescriptor::from_bounds(1.0, 1.0, None, ZoneColor::Neutral, "z").is_none());
        assert!(ZoneDescriptor::from_bounds(f64::NAN, 1.0, None, ZoneColor::Neutral, "z").is_none());
    }

    #[test]
    fn test_entry_zone_uses_entry_colour() {
        let d = ZoneDescriptor::for_analysis(&analysis("30", 1.1040, 1.1030), true).unwrap();
        assert_eq!(d.color_hint, ZoneColor::Entry);
        assert_eq!(d.label, "30 support entry");
        let p = ZoneDescriptor::for_analysis(&analysis("1D", 1.1050, 1.1020), false).unwrap();
        assert_eq!(p.color_hint, ZoneColor::Support);
    }

    #[test]
    fn test_artifacts_report_path_set_once() {
        let mut artifacts = RunArtifacts::default();
        artifacts.set_report_path(PathBuf::from("a.json"));
        artifacts.set_report_path(PathBuf::from("b.json"));
        assert_eq!(artifacts.report_path(), Some(&PathBuf::from("a.json")));
    }

    #[test]
    fn test_summary_mentions_verdict_and_failures() {
        let mut combined = CombinedAnalysis::new(
            "EURUSD",
            "swing",
            true,
            0.75,
            analysis("1D", 1.1050, 1.1020),
            analysis("30", 1.1040, 1.1030),
            ValidationReport::new().finish(),
            ValidationReport::new().finish(),
            vec![],
            vec!["1D: wait".to_string()],
        );
        combined.artifacts.push_failure(StageFailure::new(
            Stage::Rendering,
            Some("30".to_string()),
            "disk full",
        ));
        let text = combined.summary();
        assert!(text.contains("VALID SETUP"));
        assert!(text.contains("Confidence: 75%"));
        assert!(text.contains("Warning: 1D: wait"));
        assert!(text.contains("disk full"));
        assert_eq!(combined.zones().len(), 2);
    }
}
