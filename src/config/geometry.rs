//! Chart geometry and overlay rendering configuration.
//!
//! The margin and inset values were tuned against one charting surface. They
//! are defaults, and every one of them can be overridden from the config file.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometrySettings {
    /// Fraction of the visible price range the chart pads above and below
    pub auto_scale_margin_pct: f64,
    /// Pixels of toolbar/legend chrome above the plot area
    pub top_chrome_px: f64,
    /// Pixels reserved for the time axis below the plot area
    pub bottom_axis_px: f64,
    /// Thinnest band we will draw, so tiny zones stay visible
    pub min_band_height_px: f64,
    /// Width of the strip at the right edge where price-axis labels live
    pub axis_strip_px: f64,
    /// Ticks closer than this (relative) are treated as one label rendered twice
    pub tick_dedup_tolerance_pct: f64,
    /// Where the approximate band starts, as a fraction of chart height
    pub fallback_band_offset_pct: f64,
    /// Height of the approximate band, as a fraction of chart height
    pub fallback_band_height_pct: f64,
    /// Maximum overlays kept per rendering surface
    pub overlay_cap: usize,
    /// Fill opacity of zone rectangles (0.0 = invisible, 1.0 = fully opaque)
    pub zone_fill_opacity: f64,
    /// Width of the two boundary lines
    pub zone_boundary_line_width: f64,
    /// Canvas used when drawing a chart from an OHLCV series
    pub series_canvas_width: f64,
    pub series_canvas_height: f64,
}

pub const GEOMETRY: GeometrySettings = GeometrySettings {
    auto_scale_margin_pct: 0.03,
    top_chrome_px: 20.0,
    bottom_axis_px: 30.0,
    min_band_height_px: 6.0,
    axis_strip_px: 90.0,
    tick_dedup_tolerance_pct: 0.001,
    fallback_band_offset_pct: 0.45,
    fallback_band_height_pct: 0.08,
    overlay_cap: 4,
    zone_fill_opacity: 0.25,
    zone_boundary_line_width: 2.0,
    series_canvas_width: 1280.0,
    series_canvas_height: 720.0,
};

/// Zone colours (hex)
pub struct ZonePalette {
    pub support: &'static str,
    pub resistance: &'static str,
    pub entry: &'static str,
    pub neutral: &'static str,
    pub bullish_candle: &'static str,
    pub bearish_candle: &'static str,
    pub background: &'static str,
}

pub const ZONE_PALETTE: ZonePalette = ZonePalette {
    support: "#00c800",    // Green
    resistance: "#c80000", // Red
    entry: "#00bfff",      // Deep sky blue
    neutral: "#ffa500",
    bullish_candle: "#26a69a",
    bearish_candle: "#ef5350",
    background: "#131722",
};
