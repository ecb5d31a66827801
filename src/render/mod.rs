//! Zone overlays drawn onto a chart surface as SVG.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;

use crate::config::{GeometrySettings, ZONE_PALETTE, capture_stem};
use crate::data::{CaptureData, ChartScreenshot};
use crate::domain::{CandleType, Instrument};
use crate::geometry::{
    BandPlacement, CalibrationInput, ChartRect, PriceAxis, PriceScale, TextNode, VisibleRange,
    map_price_range_to_pixels,
};
use crate::models::{OhlcvSeries, ZoneColor, ZoneDescriptor};
use crate::utils::time_utils::file_stamp;

const NO_LABELS: &[TextNode] = &[];

/// One zone to draw on the surface of `instrument` x `timeframe`
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneOverlay {
    pub instrument: Instrument,
    pub timeframe: String,
    pub zone: ZoneDescriptor,
}

impl ZoneOverlay {
    fn surface_key(&self) -> String {
        capture_stem(&self.instrument.symbol, &self.timeframe)
    }
}

pub fn plan_overlay(instrument: &Instrument, timeframe: &str, zone: &ZoneDescriptor) -> ZoneOverlay {
    ZoneOverlay {
        instrument: instrument.clone(),
        timeframe: timeframe.to_string(),
        zone: zone.clone(),
    }
}

#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Draw one run's overlays for a single surface onto a fresh image and return its path
    async fn render_overlays(&self, data: &CaptureData, overlays: &[ZoneOverlay]) -> Result<PathBuf>;
}

/// Holds no overlays between calls; each render starts from a blank canvas
pub struct SvgRenderer {
    output_dir: PathBuf,
    settings: GeometrySettings,
}

impl SvgRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, settings: GeometrySettings) -> Self {
        Self {
            output_dir: output_dir.into(),
            settings,
        }
    }

    /// The newest `overlay_cap` overlays; older ones are pruned first
    fn capped<'a>(&self, overlays: &'a [ZoneOverlay]) -> &'a [ZoneOverlay] {
        let cap = self.settings.overlay_cap.max(1);
        &overlays[overlays.len().saturating_sub(cap)..]
    }

    fn draw(&self, data: &CaptureData, overlays: &[ZoneOverlay]) -> Result<String> {
        let mut svg = String::new();
        let (rect, canvas_w, canvas_h) = match data {
            CaptureData::Screenshot(shot) => (shot.chart_rect, shot.chart_rect.right(), shot.chart_rect.bottom()),
            CaptureData::Series(_) => {
                let (w, h) = (self.settings.series_canvas_width, self.settings.series_canvas_height);
                (ChartRect::new(0.0, 0.0, w, h), w, h)
            }
        };
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
            w = canvas_w,
            h = canvas_h
        );
        let _ = writeln!(
            svg,
            r#"<rect x="0" y="0" width="{:.0}" height="{:.0}" fill="{}"/>"#,
            canvas_w, canvas_h, ZONE_PALETTE.background
        );

        let series_range = match data {
            CaptureData::Screenshot(shot) => {
                draw_screenshot(&mut svg, shot);
                None
            }
            CaptureData::Series(series) => Some(self.draw_series(&mut svg, &rect, series)?),
        };

        for overlay in overlays {
            let class = overlay.instrument.class;
            let input = match data {
                CaptureData::Screenshot(shot) => CalibrationInput {
                    visible_range: overlay.zone.visible_range.or(shot.visible_range),
                    labels: &shot.price_labels,
                    class,
                },
                CaptureData::Series(_) => CalibrationInput {
                    visible_range: series_range,
                    labels: NO_LABELS,
                    class,
                },
            };
            let placement = map_price_range_to_pixels(
                &rect,
                overlay.zone.price_high,
                overlay.zone.price_low,
                &input,
                &self.settings,
            )?;
            self.draw_band(&mut svg, &rect, overlay, &placement);
        }

        svg.push_str("</svg>\n");
        Ok(svg)
    }

    fn draw_series(&self, svg: &mut String, rect: &ChartRect, series: &OhlcvSeries) -> Result<VisibleRange> {
        let (high, low) = series
            .price_range()
            .context("Cannot draw an empty series")?;
        let range = VisibleRange { high, low };
        let scale = PriceScale::new(rect, range, &self.settings)?;

        let plot_width = (rect.width - self.settings.axis_strip_px).max(1.0);
        let step = plot_width / series.klines().max(1) as f64;
        let body_w = (step * 0.7).max(1.0);

        for (i, c) in series.candles().enumerate() {
            let colour = match c.get_type() {
                CandleType::Bullish => ZONE_PALETTE.bullish_candle,
                CandleType::Bearish => ZONE_PALETTE.bearish_candle,
            };
            let cx = rect.x + step * (i as f64 + 0.5);
            let (body_low, body_high) = c.body_range();
            let body_top = scale.y_for(body_high);
            let body_h = (scale.y_for(body_low) - body_top).max(1.0);
            let _ = writeln!(
                svg,
                r#"<line x1="{cx:.2}" y1="{:.2}" x2="{cx:.2}" y2="{:.2}" stroke="{colour}" stroke-width="1"/>"#,
                scale.y_for(c.high_price),
                scale.y_for(c.low_price),
            );
            let _ = writeln!(
                svg,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{colour}"/>"#,
                cx - body_w / 2.0,
                body_top,
                body_w,
                body_h,
            );
        }

        // Price axis labels so the image can be read (and re-calibrated) on its own
        let decimals = Instrument::new(&series.symbol).class.price_decimals();
        let axis_x = rect.right() - self.settings.axis_strip_px + 8.0;
        for k in 0..=4 {
            let price = low + (high - low) * k as f64 / 4.0;
            let _ = writeln!(
                svg,
                r##"<text x="{:.0}" y="{:.2}" fill="#d1d4dc" font-size="12" font-family="monospace">{:.*}</text>"##,
                axis_x,
                scale.y_for(price) + 4.0,
                decimals,
                price
            );
        }
        Ok(range)
    }

    fn draw_band(&self, svg: &mut String, rect: &ChartRect, overlay: &ZoneOverlay, placement: &BandPlacement) {
        let colour = match overlay.zone.color_hint {
            ZoneColor::Support => ZONE_PALETTE.support,
            ZoneColor::Resistance => ZONE_PALETTE.resistance,
            ZoneColor::Entry => ZONE_PALETTE.entry,
            ZoneColor::Neutral => ZONE_PALETTE.neutral,
        };
        let dash = if placement.is_approximate() { r#" stroke-dasharray="8 4""# } else { "" };
        let label = if placement.is_approximate() {
            format!("{} (approx.)", overlay.zone.label)
        } else {
            overlay.zone.label.clone()
        };
        let width = self.settings.zone_boundary_line_width;

        let _ = writeln!(
            svg,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{colour}" fill-opacity="{:.2}"/>"#,
            rect.x, placement.y_top, rect.width, placement.height, self.settings.zone_fill_opacity
        );
        for y in [placement.y_top, placement.y_bottom] {
            let _ = writeln!(
                svg,
                r#"<line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="{colour}" stroke-width="{width}"{dash}/>"#,
                rect.x,
                rect.right(),
            );
        }
        let _ = writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" fill="{colour}" font-size="14" font-family="sans-serif">{} {} - {}</text>"#,
            rect.x + 8.0,
            (placement.y_top - 4.0).max(rect.y + 14.0),
            escape_xml(&label),
            overlay.instrument.format_price(overlay.zone.price_low),
            overlay.instrument.format_price(overlay.zone.price_high),
        );
    }
}

fn draw_screenshot(svg: &mut String, shot: &ChartScreenshot) {
    let href = escape_xml(&shot.path.to_string_lossy());
    let _ = writeln!(
        svg,
        r#"<image href="{href}" x="0" y="0" width="{:.0}" height="{:.0}" preserveAspectRatio="none"/>"#,
        shot.chart_rect.right(),
        shot.chart_rect.bottom()
    );
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[async_trait]
impl RenderSurface for SvgRenderer {
    async fn render_overlays(&self, data: &CaptureData, overlays: &[ZoneOverlay]) -> Result<PathBuf> {
        let Some(first) = overlays.first() else {
            bail!("Nothing to render");
        };
        let stem = first.surface_key();
        if let Some(stray) = overlays.iter().find(|o| o.surface_key() != stem) {
            bail!("Overlay for {} does not belong on surface {}", stray.surface_key(), stem);
        }

        let live = self.capped(overlays);
        if live.len() < overlays.len() {
            log::debug!("Pruned {} overlay(s) on {}", overlays.len() - live.len(), stem);
        }
        let svg = self.draw(data, live)?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .context(format!("Failed to create directory: {}", self.output_dir.display()))?;
        let path = self
            .output_dir
            .join(format!("{}_{}.svg", stem, file_stamp(&Utc::now())));
        tokio::fs::write(&path, svg)
            .await
            .context(format!("Failed to write chart: {}", path.display()))?;
        log::info!("Rendered {} overlay(s) to {}", live.len(), path.display());
        Ok(path)
    }
}
