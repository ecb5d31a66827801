//! Runtime configuration: the const defaults above, optionally overridden by a JSON file.
//! Loaded once at process start and shared read-only.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::analysis::{DEFAULT_INSTRUMENTS, SCALPING, SWING, StrategySettings};
use super::geometry::{GEOMETRY, GeometrySettings};
use super::persistence::{CAPTURE_DIR, RENDERS_DIR, REPORTS_DIR};
use super::provider::ProviderSettings;
use super::retry::{FALLBACK, FallbackSettings, RETRY, RetrySettings, TIMEOUTS, TimeoutSettings};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    pub reports_dir: String,
    pub renders_dir: String,
    pub capture_dir: String,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            reports_dir: REPORTS_DIR.to_string(),
            renders_dir: RENDERS_DIR.to_string(),
            capture_dir: CAPTURE_DIR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub instruments: Vec<String>,
    pub swing: StrategySettings,
    pub scalping: StrategySettings,
    pub retry: RetrySettings,
    pub timeouts: TimeoutSettings,
    pub fallback: FallbackSettings,
    pub geometry: GeometrySettings,
    pub persistence: PersistenceSettings,
    pub provider: ProviderSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            instruments: DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
            swing: SWING,
            scalping: SCALPING,
            retry: RETRY,
            timeouts: TIMEOUTS,
            fallback: FALLBACK,
            geometry: GEOMETRY,
            persistence: PersistenceSettings::default(),
            provider: ProviderSettings::default(),
        }
    }
}

impl AppConfig {
    /// Defaults when `path` is None, otherwise the file's values layered over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_json(&text)
                    .with_context(|| format!("Invalid config file: {}", path.display()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(text)?;
        Ok(config)
    }

    /// Reject settings that would make a run meaningless rather than failing mid-pipeline
    pub fn validate(&self) -> Result<()> {
        for (name, strategy) in [("swing", &self.swing), ("scalping", &self.scalping)] {
            if strategy.pip_band.min_pips > strategy.pip_band.max_pips {
                bail!(
                    "{}: pip band is inverted ({} > {})",
                    name,
                    strategy.pip_band.min_pips,
                    strategy.pip_band.max_pips
                );
            }
            if !(0.0..=1.0).contains(&strategy.min_confidence) {
                bail!(
                    "{}: min_confidence {} is outside [0, 1]",
                    name,
                    strategy.min_confidence
                );
            }
            if strategy.primary.bars_requested == 0 || strategy.entry.bars_requested == 0 {
                bail!("{}: bars_requested must be positive", name);
            }
        }
        if self.retry.capture.retries == 0 || self.retry.analysis.retries == 0 {
            bail!("retry counts must allow at least one attempt");
        }
        if self.retry.capture.factor < 1.0 || self.retry.analysis.factor < 1.0 {
            bail!("retry backoff factor must be >= 1.0");
        }
        let g = &self.geometry;
        if g.auto_scale_margin_pct < 0.0 || g.top_chrome_px < 0.0 || g.bottom_axis_px < 0.0 {
            bail!("geometry margins and insets must be non-negative");
        }
        if g.min_band_height_px <= 0.0 {
            bail!("geometry.min_band_height_px must be positive");
        }
        if !(0.0..1.0).contains(&g.fallback_band_offset_pct)
            || g.fallback_band_height_pct <= 0.0
            || g.fallback_band_offset_pct + g.fallback_band_height_pct > 1.0
        {
            bail!("fallback band must lie inside the chart");
        }
        if g.overlay_cap == 0 {
            bail!("geometry.overlay_cap must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.fallback.confidence) {
            bail!("fallback.confidence must be inside [0, 1]");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let json = r#"{ "geometry": { "auto_scale_margin_pct": 0.05, "top_chrome_px": 10.0,
            "bottom_axis_px": 25.0, "min_band_height_px": 4.0, "axis_strip_px": 80.0,
            "tick_dedup_tolerance_pct": 0.001, "fallback_band_offset_pct": 0.4,
            "fallback_band_height_pct": 0.1, "overlay_cap": 3, "zone_fill_opacity": 0.3,
            "zone_boundary_line_width": 1.0, "series_canvas_width": 800.0,
            "series_canvas_height": 600.0 },
            "instruments": ["EURUSD"] }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.geometry.overlay_cap, 3);
        assert_eq!(config.instruments, vec!["EURUSD".to_string()]);
        // Untouched sections keep their defaults
        assert_eq!(config.swing, SWING);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_pip_band_rejected() {
        let mut config = AppConfig::default();
        config.scalping.pip_band.min_pips = 50.0;
        assert!(config.validate().is_err());
    }
}
