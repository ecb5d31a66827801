use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::capture_stem;
use crate::domain::{Instrument, TimeframeSpec};
use crate::geometry::{ChartRect, TextNode, VisibleRange};
use crate::models::OhlcvSeries;

/// An open capture session. Owned by one run and handed back to `close`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureHandle {
    pub source: &'static str,
    pub opened_at: DateTime<Utc>,
}

/// A chart image plus what we know about where its price axis is
#[derive(Debug, Clone, PartialEq)]
pub struct ChartScreenshot {
    pub path: PathBuf,
    pub chart_rect: ChartRect,
    pub price_labels: Vec<TextNode>,
    pub visible_range: Option<VisibleRange>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureData {
    Screenshot(ChartScreenshot),
    Series(OhlcvSeries),
}

impl CaptureData {
    /// Raw image kept with the report, if this capture produced one
    pub fn raw_artifact(&self) -> Option<&Path> {
        match self {
            CaptureData::Screenshot(shot) => Some(&shot.path),
            CaptureData::Series(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CaptureData::Screenshot(_) => "screenshot",
            CaptureData::Series(_) => "series",
        }
    }
}

#[async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn initialize(&self) -> Result<CaptureHandle>;

    async fn capture(
        &self,
        handle: &CaptureHandle,
        instrument: &Instrument,
        timeframe: &TimeframeSpec,
    ) -> Result<CaptureData>;

    async fn close(&self, handle: CaptureHandle) -> Result<()>;

    /// A unique identifier for this implementation (so that afterwards we know which one we used).
    fn signature(&self) -> &'static str;
}

async fn require_dir(dir: &Path) -> Result<()> {
    let meta = tokio::fs::metadata(dir)
        .await
        .with_context(|| format!("Capture directory not found: {}", dir.display()))?;
    if !meta.is_dir() {
        bail!("Capture path is not a directory: {}", dir.display());
    }
    Ok(())
}

// ============================================================================
// SeriesFileCapture: OHLCV series stored as JSON or bincode
// ============================================================================

pub struct SeriesFileCapture {
    dir: PathBuf,
}

impl SeriesFileCapture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, instrument: &Instrument, timeframe: &TimeframeSpec, ext: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", capture_stem(&instrument.symbol, timeframe.id()), ext))
    }

    /// Write a series in the compact bincode layout this provider reads back
    pub fn store_bin(&self, series: &OhlcvSeries) -> Result<PathBuf> {
        let instrument = Instrument::new(&series.symbol);
        let timeframe = TimeframeSpec {
            identifier: series.timeframe.clone().into(),
            bars_requested: series.klines(),
        };
        let path = self.path_for(&instrument, &timeframe, "bin");
        std::fs::create_dir_all(&self.dir)
            .context(format!("Failed to create directory: {}", self.dir.display()))?;
        let bytes = bincode::serialize(series)
            .context(format!("Failed to serialize series to: {}", path.display()))?;
        std::fs::write(&path, bytes).context(format!("Failed to write: {}", path.display()))?;
        Ok(path)
    }

    async fn load(&self, instrument: &Instrument, timeframe: &TimeframeSpec) -> Result<OhlcvSeries> {
        let json_path = self.path_for(instrument, timeframe, "json");
        if tokio::fs::try_exists(&json_path).await.unwrap_or(false) {
            let bytes = tokio::fs::read(&json_path)
                .await
                .context(format!("Failed to read: {}", json_path.display()))?;
            return serde_json::from_slice(&bytes)
                .context(format!("Failed to parse series JSON: {}", json_path.display()));
        }

        let bin_path = self.path_for(instrument, timeframe, "bin");
        let bytes = tokio::fs::read(&bin_path).await.with_context(|| {
            format!(
                "No series file for {} {} (looked for {} and {})",
                instrument.symbol,
                timeframe.id(),
                json_path.display(),
                bin_path.display()
            )
        })?;
        bincode::deserialize(&bytes)
            .context(format!("Failed to deserialize series: {}", bin_path.display()))
    }
}

#[async_trait]
impl CaptureProvider for SeriesFileCapture {
    async fn initialize(&self) -> Result<CaptureHandle> {
        require_dir(&self.dir).await?;
        Ok(CaptureHandle {
            source: self.signature(),
            opened_at: Utc::now(),
        })
    }

    async fn capture(
        &self,
        _handle: &CaptureHandle,
        instrument: &Instrument,
        timeframe: &TimeframeSpec,
    ) -> Result<CaptureData> {
        let series = self.load(instrument, timeframe).await?;
        series.check_consistency()?;
        if series.is_empty() {
            bail!("{} {}: series file has no bars", instrument.symbol, timeframe.id());
        }
        let series = series.tail(timeframe.bars_requested);
        log::info!(
            "Loaded {} bars of {} {}",
            series.klines(),
            instrument.symbol,
            timeframe.label()
        );
        Ok(CaptureData::Series(series))
    }

    async fn close(&self, _handle: CaptureHandle) -> Result<()> {
        Ok(())
    }

    fn signature(&self) -> &'static str {
        "Series files"
    }
}

// ============================================================================
// ScreenshotDirCapture: pre-rendered chart images with a geometry sidecar
// ============================================================================

/// `{SYMBOL}_{tf}.json` next to the image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotSidecar {
    pub chart_rect: ChartRect,
    #[serde(default)]
    pub price_labels: Vec<TextNode>,
    #[serde(default)]
    pub visible_range: Option<VisibleRange>,
}

pub struct ScreenshotDirCapture {
    dir: PathBuf,
}

impl ScreenshotDirCapture {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CaptureProvider for ScreenshotDirCapture {
    async fn initialize(&self) -> Result<CaptureHandle> {
        require_dir(&self.dir).await?;
        Ok(CaptureHandle {
            source: self.signature(),
            opened_at: Utc::now(),
        })
    }

    async fn capture(
        &self,
        _handle: &CaptureHandle,
        instrument: &Instrument,
        timeframe: &TimeframeSpec,
    ) -> Result<CaptureData> {
        let stem = capture_stem(&instrument.symbol, timeframe.id());
        let image = self.dir.join(format!("{}.png", stem));
        let sidecar_path = self.dir.join(format!("{}.json", stem));

        if !tokio::fs::try_exists(&image).await.unwrap_or(false) {
            bail!("Screenshot not found: {}", image.display());
        }
        let text = tokio::fs::read_to_string(&sidecar_path)
            .await
            .context(format!("Failed to read sidecar: {}", sidecar_path.display()))?;
        let sidecar: ScreenshotSidecar = serde_json::from_str(&text)
            .context(format!("Invalid sidecar: {}", sidecar_path.display()))?;

        Ok(CaptureData::Screenshot(ChartScreenshot {
            path: image,
            chart_rect: sidecar.chart_rect,
            price_labels: sidecar.price_labels,
            visible_range: sidecar.visible_range,
        }))
    }

    async fn close(&self, _handle: CaptureHandle) -> Result<()> {
        Ok(())
    }

    fn signature(&self) -> &'static str {
        "Screenshot directory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Candle;

    fn series(symbol: &str, tf: &str, bars: usize) -> OhlcvSeries {
        let candles: Vec<Candle> = (0..bars)
            .map(|i| {
                let base = 1.10 + i as f64 * 0.001;
                Candle::new(base, base + 0.002, base - 0.002, base + 0.001, 10.0)
            })
            .collect();
        OhlcvSeries::from_candles(symbol, tf, 60_000, 0, &candles)
    }

    #[tokio::test]
    async fn test_series_json_and_bin_round_through_capture() {
        let dir = tempfile::tempdir().unwrap();
        let json_series = series("EURUSD", "1D", 10);
        std::fs::write(
            dir.path().join("EURUSD_1D.json"),
            serde_json::to_vec(&json_series).unwrap(),
        )
        .unwrap();
        let provider = SeriesFileCapture::new(dir.path());
        provider.store_bin(&series("EURUSD", "30", 300)).unwrap();

        let handle = provider.initialize().await.unwrap();
        let daily = provider
            .capture(&handle, &Instrument::new("EURUSD"), &TimeframeSpec::new("1D", 120))
            .await
            .unwrap();
        assert_eq!(daily, CaptureData::Series(json_series));

        let intraday = provider
            .capture(&handle, &Instrument::new("EURUSD"), &TimeframeSpec::new("30", 200))
            .await
            .unwrap();
        match intraday {
            CaptureData::Series(s) => assert_eq!(s.klines(), 200),
            other => panic!("unexpected capture {:?}", other.kind()),
        }
        provider.close(handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_files_and_dirs_fail() {
        let dir = tempfile::tempdir().unwrap();
        let provider = SeriesFileCapture::new(dir.path());
        let handle = provider.initialize().await.unwrap();
        assert!(
            provider
                .capture(&handle, &Instrument::new("GBPUSD"), &TimeframeSpec::new("1D", 10))
                .await
                .is_err()
        );

        let missing = SeriesFileCapture::new(dir.path().join("nope"));
        assert!(missing.initialize().await.is_err());
    }

    #[tokio::test]
    async fn test_screenshot_with_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("EURUSD_1D.png"), b"\x89PNG").unwrap();
        std::fs::write(
            dir.path().join("EURUSD_1D.json"),
            r#"{ "chart_rect": { "x": 0.0, "y": 0.0, "width": 1000.0, "height": 500.0 },
                 "visible_range": { "high": 1.1, "low": 1.09 } }"#,
        )
        .unwrap();

        let provider = ScreenshotDirCapture::new(dir.path());
        let handle = provider.initialize().await.unwrap();
        let data = provider
            .capture(&handle, &Instrument::new("EURUSD"), &TimeframeSpec::new("1D", 120))
            .await
            .unwrap();
        assert_eq!(data.raw_artifact(), Some(dir.path().join("EURUSD_1D.png").as_path()));
        match data {
            CaptureData::Screenshot(shot) => {
                assert!(shot.price_labels.is_empty());
                assert_eq!(shot.visible_range, Some(VisibleRange { high: 1.1, low: 1.09 }));
            }
            other => panic!("unexpected capture {:?}", other.kind()),
        }
    }
}
