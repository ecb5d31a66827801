//! Zone geometry: mapping a price band onto chart pixels.
//!
//! Calibration is tried in order of trust: an explicit visible price range,
//! then ticks read off the price axis, then a fixed approximate band.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GeometrySettings;
#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;
use crate::domain::InstrumentClass;

pub mod ticks;

pub use ticks::{PriceTick, TextNode, TickScale, discover_ticks, parse_price_label};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("invalid zone: high {high} must be above low {low} and both finite")]
    InvalidZone { high: f64, low: f64 },
    #[error("chart rect has no area ({width}x{height})")]
    InvalidRect { width: f64, height: f64 },
    #[error("found {found} usable price ticks, need at least 2")]
    InsufficientTicks { found: usize },
    #[error("price ticks do not span distinct prices and positions")]
    DegenerateTicks,
}

/// Chart area in page pixels; y grows downwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ChartRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        ChartRect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.y && y <= self.bottom()
    }

    fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}

/// Highest and lowest price the chart was showing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleRange {
    pub high: f64,
    pub low: f64,
}

impl VisibleRange {
    pub fn is_usable(&self) -> bool {
        self.high.is_finite() && self.low.is_finite() && self.high > self.low
    }
}

/// What we know about the chart's price scale
#[derive(Debug, Clone, Copy)]
pub struct CalibrationInput<'a> {
    pub visible_range: Option<VisibleRange>,
    pub labels: &'a [TextNode],
    pub class: InstrumentClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    VisibleRange,
    TickLabels,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPlacement {
    pub y_top: f64,
    pub y_bottom: f64,
    pub height: f64,
    pub mode: CalibrationMode,
}

impl BandPlacement {
    /// True when the band position is a guess, not derived from the chart's scale
    pub fn is_approximate(&self) -> bool {
        self.mode == CalibrationMode::Fallback
    }
}

/// Price <-> pixel mapping shared by the calibration strategies
pub trait PriceAxis {
    fn y_for(&self, price: f64) -> f64;
    fn price_at(&self, y: f64) -> f64;
}

/// Mapping from a known visible range, padded by the chart's auto-scale margin
/// and inset by its top chrome and bottom time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceScale {
    adj_high: f64,
    adj_range: f64,
    plot_top: f64,
    plot_height: f64,
}

impl PriceScale {
    pub fn new(
        rect: &ChartRect,
        range: VisibleRange,
        settings: &GeometrySettings,
    ) -> Result<Self, GeometryError> {
        if !range.is_usable() {
            return Err(GeometryError::InvalidZone {
                high: range.high,
                low: range.low,
            });
        }
        let margin = (range.high - range.low) * settings.auto_scale_margin_pct;
        let adj_high = range.high + margin;
        let adj_low = range.low - margin;
        let plot_height = rect.height - settings.top_chrome_px - settings.bottom_axis_px;
        if plot_height <= 0.0 {
            return Err(GeometryError::InvalidRect {
                width: rect.width,
                height: rect.height,
            });
        }
        Ok(PriceScale {
            adj_high,
            adj_range: adj_high - adj_low,
            plot_top: rect.y + settings.top_chrome_px,
            plot_height,
        })
    }
}

impl PriceAxis for PriceScale {
    fn y_for(&self, price: f64) -> f64 {
        self.plot_top + (self.adj_high - price) / self.adj_range * self.plot_height
    }

    fn price_at(&self, y: f64) -> f64 {
        self.adj_high - (y - self.plot_top) / self.plot_height * self.adj_range
    }
}

/// Map a price band to a vertical pixel band inside `rect`.
pub fn map_price_range_to_pixels(
    rect: &ChartRect,
    price_high: f64,
    price_low: f64,
    input: &CalibrationInput,
    settings: &GeometrySettings,
) -> Result<BandPlacement, GeometryError> {
    if !price_high.is_finite() || !price_low.is_finite() || price_high <= price_low {
        return Err(GeometryError::InvalidZone {
            high: price_high,
            low: price_low,
        });
    }
    if !rect.is_valid() {
        return Err(GeometryError::InvalidRect {
            width: rect.width,
            height: rect.height,
        });
    }

    let (raw_a, raw_b, mode) = match calibrate(rect, input, settings) {
        Some(Calibration::Range(scale)) => (
            scale.y_for(price_high),
            scale.y_for(price_low),
            CalibrationMode::VisibleRange,
        ),
        Some(Calibration::Ticks(scale)) => (
            scale.y_for(price_high),
            scale.y_for(price_low),
            CalibrationMode::TickLabels,
        ),
        None => {
            let top = rect.y + settings.fallback_band_offset_pct * rect.height;
            let height = settings.fallback_band_height_pct * rect.height;
            (top, top + height, CalibrationMode::Fallback)
        }
    };

    let (y_top, y_bottom) = normalize_band(rect, raw_a, raw_b, settings.min_band_height_px);
    let placement = BandPlacement {
        y_top,
        y_bottom,
        height: y_bottom - y_top,
        mode,
    };

    #[cfg(debug_assertions)]
    if DEBUG_FLAGS.print_geometry {
        log::info!(
            "Zone {}-{} -> y {:.2}..{:.2} via {:?}",
            price_low,
            price_high,
            placement.y_top,
            placement.y_bottom,
            placement.mode
        );
    }

    Ok(placement)
}

enum Calibration {
    Range(PriceScale),
    Ticks(TickScale),
}

fn calibrate(
    rect: &ChartRect,
    input: &CalibrationInput,
    settings: &GeometrySettings,
) -> Option<Calibration> {
    if let Some(range) = input.visible_range {
        match PriceScale::new(rect, range, settings) {
            Ok(scale) => return Some(Calibration::Range(scale)),
            Err(e) => log::debug!("Visible range unusable ({}), trying tick labels", e),
        }
    }

    let ticks = discover_ticks(rect, input.labels, input.class, settings);
    match TickScale::from_ticks(&ticks) {
        Ok(scale) => Some(Calibration::Ticks(scale)),
        Err(e) => {
            log::debug!("Tick calibration failed ({}), using approximate band", e);
            None
        }
    }
}

/// Order, clamp to the rect, widen to the minimum height, then shift back inside.
fn normalize_band(rect: &ChartRect, a: f64, b: f64, min_height: f64) -> (f64, f64) {
    let clamp = |y: f64| y.clamp(rect.y, rect.bottom());
    let mut top = clamp(a.min(b));
    let mut bottom = clamp(a.max(b));

    let min_height = min_height.min(rect.height);
    if bottom - top < min_height {
        let mid = (top + bottom) / 2.0;
        top = mid - min_height / 2.0;
        bottom = mid + min_height / 2.0;
    }

    if top < rect.y {
        bottom += rect.y - top;
        top = rect.y;
    }
    if bottom > rect.bottom() {
        top -= bottom - rect.bottom();
        bottom = rect.bottom();
    }
    (top.max(rect.y), bottom)
}
