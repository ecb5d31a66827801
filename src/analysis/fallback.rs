//! Offline heuristic used while the AI provider is unavailable.
//!
//! Pure and deterministic. Results are stamped `AnalysisSource::Fallback` and
//! carry a deliberately low confidence so consumers treat them as approximate.

use anyhow::{Result, bail};

use crate::config::GeometrySettings;
use crate::data::capture::{CaptureData, ChartScreenshot};
use crate::domain::{Candle, Instrument, TimeframeRole, TimeframeSpec};
use crate::geometry::discover_ticks;
use crate::models::{AnalysisSource, OhlcvSeries, Signal, TimeframeAnalysis, Trend, ZoneType};
use crate::utils::maths_utils::ranges_overlap;

/// Bars either side that must be lower (or higher) for a pivot
const PIVOT_WINDOW: usize = 2;
/// Bars used for the micro-trend read
const MICRO_TREND_BARS: usize = 10;
const MIN_BARS: usize = 2 * PIVOT_WINDOW + 1;

/// Everything the heuristic needs besides the captured data
#[derive(Debug, Clone, Copy)]
pub struct HeuristicContext<'a> {
    pub instrument: &'a Instrument,
    pub timeframe: &'a TimeframeSpec,
    pub role: TimeframeRole,
    /// Completed primary analysis, for the entry role
    pub parent: Option<&'a TimeframeAnalysis>,
    pub confidence: f64,
    pub geometry: &'a GeometrySettings,
}

pub fn heuristic_analysis(data: &CaptureData, ctx: &HeuristicContext) -> Result<TimeframeAnalysis> {
    let mut analysis = match data {
        CaptureData::Series(series) => analyze_series(series, ctx)?,
        CaptureData::Screenshot(shot) => analyze_screenshot(shot, ctx)?,
    };
    analysis.instrument = ctx.instrument.symbol.clone();
    analysis.timeframe = ctx.timeframe.id().to_string();
    analysis.source = AnalysisSource::Fallback;
    analysis.confidence = Some(ctx.confidence);

    if ctx.role == TimeframeRole::Entry {
        apply_parent_context(&mut analysis, ctx.parent);
    }

    log::info!(
        "Fallback analysis for {} {}: {} / {}",
        analysis.instrument,
        analysis.timeframe,
        analysis.trend.as_ref().map_or("-", |t| t.as_str()),
        analysis.signal.as_ref().map_or("-", |s| s.as_str()),
    );
    Ok(analysis)
}

// ============================================================================
// Series mode
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Pivot {
    idx: usize,
    price: f64,
}

fn analyze_series(series: &OhlcvSeries, ctx: &HeuristicContext) -> Result<TimeframeAnalysis> {
    let view = series.tail(ctx.timeframe.bars_requested.max(MIN_BARS));
    if view.klines() < MIN_BARS {
        bail!(
            "{} {}: {} bars is too few for the heuristic (need {})",
            ctx.instrument,
            ctx.timeframe.id(),
            view.klines(),
            MIN_BARS
        );
    }
    let candles: Vec<Candle> = view.candles().collect();

    let (pivot_highs, pivot_lows) = find_pivots(&candles);
    let trend = structure_trend(&pivot_highs, &pivot_lows);
    let last_close = view.last_close().unwrap_or_default();

    let zone_type = match trend {
        Trend::Uptrend => ZoneType::Support,
        Trend::Downtrend => ZoneType::Resistance,
        _ => nearest_zone_type(&pivot_highs, &pivot_lows, last_close),
    };
    let (zone_high, zone_low) = wick_zone(&candles, &zone_type, &pivot_highs, &pivot_lows);

    let pattern = engulfing_pattern(&candles);
    let signal = aligned_signal(&trend, &zone_type, pattern);

    let micro_trend = close_direction(&candles[candles.len().saturating_sub(MICRO_TREND_BARS)..]);
    let (chart_high, chart_low) = view.price_range().unzip();

    Ok(TimeframeAnalysis {
        reasoning: Some(format!(
            "Heuristic: {} structure from {} pivot highs / {} pivot lows, {} zone from the latest pivot wick, pattern {}",
            trend,
            pivot_highs.len(),
            pivot_lows.len(),
            zone_type,
            pattern.unwrap_or("none")
        )),
        trend: Some(trend),
        micro_trend: Some(micro_trend),
        signal: Some(signal),
        pattern: pattern.map(str::to_string),
        zone_type: Some(zone_type),
        zone_high: Some(zone_high),
        zone_low: Some(zone_low),
        chart_price_high: chart_high,
        chart_price_low: chart_low,
        ..Default::default()
    })
}

fn find_pivots(candles: &[Candle]) -> (Vec<Pivot>, Vec<Pivot>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for i in PIVOT_WINDOW..candles.len().saturating_sub(PIVOT_WINDOW) {
        let window = &candles[i - PIVOT_WINDOW..=i + PIVOT_WINDOW];
        let c = candles[i];
        let is_high = window
            .iter()
            .enumerate()
            .all(|(j, w)| j == PIVOT_WINDOW || w.high_price < c.high_price);
        let is_low = window
            .iter()
            .enumerate()
            .all(|(j, w)| j == PIVOT_WINDOW || w.low_price > c.low_price);
        if is_high {
            highs.push(Pivot {
                idx: i,
                price: c.high_price,
            });
        }
        if is_low {
            lows.push(Pivot {
                idx: i,
                price: c.low_price,
            });
        }
    }
    (highs, lows)
}

/// HH + HL is an uptrend, LH + LL a downtrend, anything else sideways
fn structure_trend(highs: &[Pivot], lows: &[Pivot]) -> Trend {
    let last_two = |p: &[Pivot]| match p {
        [.., a, b] => Some((a.price, b.price)),
        _ => None,
    };
    match (last_two(highs), last_two(lows)) {
        (Some((h1, h2)), Some((l1, l2))) if h2 > h1 && l2 > l1 => Trend::Uptrend,
        (Some((h1, h2)), Some((l1, l2))) if h2 < h1 && l2 < l1 => Trend::Downtrend,
        _ => Trend::Sideways,
    }
}

fn nearest_zone_type(highs: &[Pivot], lows: &[Pivot], close: f64) -> ZoneType {
    match (highs.last(), lows.last()) {
        (Some(h), Some(l)) if (h.price - close).abs() < (close - l.price).abs() => {
            ZoneType::Resistance
        }
        (Some(_), None) => ZoneType::Resistance,
        _ => ZoneType::Support,
    }
}

/// Wick of the latest relevant pivot candle, widened to the full candle if the wick is flat.
/// Without pivots, the extreme candle of the window is used.
fn wick_zone(
    candles: &[Candle],
    zone_type: &ZoneType,
    highs: &[Pivot],
    lows: &[Pivot],
) -> (f64, f64) {
    let is_resistance = *zone_type == ZoneType::Resistance;
    let pivot_idx = if is_resistance {
        highs.last().map(|p| p.idx)
    } else {
        lows.last().map(|p| p.idx)
    };
    let idx = pivot_idx.unwrap_or_else(|| extreme_index(candles, is_resistance));
    let c = candles[idx];

    let (high, low) = if is_resistance {
        (c.high_wick_high(), c.high_wick_low())
    } else {
        (c.low_wick_high(), c.low_wick_low())
    };
    if high > low {
        (high, low)
    } else {
        (c.high_price, c.low_price)
    }
}

fn extreme_index(candles: &[Candle], highest: bool) -> usize {
    candles
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            if highest {
                a.high_price.total_cmp(&b.high_price)
            } else {
                b.low_price.total_cmp(&a.low_price)
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn engulfing_pattern(candles: &[Candle]) -> Option<&'static str> {
    let [.., previous, last] = candles else {
        return None;
    };
    if last.is_bullish_engulfing(previous) {
        Some("bullish_engulfing")
    } else if last.is_bearish_engulfing(previous) {
        Some("bearish_engulfing")
    } else {
        None
    }
}

fn aligned_signal(trend: &Trend, zone_type: &ZoneType, pattern: Option<&str>) -> Signal {
    match (trend, zone_type, pattern) {
        (Trend::Uptrend, ZoneType::Support, Some("bullish_engulfing")) => Signal::Buy,
        (Trend::Downtrend, ZoneType::Resistance, Some("bearish_engulfing")) => Signal::Sell,
        _ => Signal::Wait,
    }
}

fn close_direction(candles: &[Candle]) -> Trend {
    match (candles.first(), candles.last()) {
        (Some(first), Some(last)) if last.close_price > first.close_price => Trend::Uptrend,
        (Some(first), Some(last)) if last.close_price < first.close_price => Trend::Downtrend,
        _ => Trend::Sideways,
    }
}

// ============================================================================
// Screenshot mode
// ============================================================================

/// Without pixels to read, the best we can do is a wait with a zone between
/// the two axis ticks around the middle of the chart.
fn analyze_screenshot(shot: &ChartScreenshot, ctx: &HeuristicContext) -> Result<TimeframeAnalysis> {
    let ticks = discover_ticks(
        &shot.chart_rect,
        &shot.price_labels,
        ctx.instrument.class,
        ctx.geometry,
    );
    if ticks.len() < 2 {
        bail!(
            "{} {}: only {} price ticks on the screenshot, cannot place a zone",
            ctx.instrument,
            ctx.timeframe.id(),
            ticks.len()
        );
    }
    let mid = ticks.len() / 2;
    let (lower, upper) = (ticks[mid - 1], ticks[mid]);
    let (first, last) = (ticks[0], ticks[ticks.len() - 1]);

    Ok(TimeframeAnalysis {
        trend: Some(Trend::Sideways),
        signal: Some(Signal::Wait),
        zone_high: Some(upper.price),
        zone_low: Some(lower.price),
        chart_price_high: Some(shot.visible_range.map_or(last.price, |r| r.high)),
        chart_price_low: Some(shot.visible_range.map_or(first.price, |r| r.low)),
        reasoning: Some(format!(
            "Heuristic: chart image not interpretable offline; zone spans axis ticks {} - {}",
            ctx.instrument.format_price(lower.price),
            ctx.instrument.format_price(upper.price)
        )),
        ..Default::default()
    })
}

/// Entry containment against the parent zone; an entry signal survives only
/// when it is inside and agrees with the parent signal.
fn apply_parent_context(analysis: &mut TimeframeAnalysis, parent: Option<&TimeframeAnalysis>) {
    let parent_zone = parent.and_then(|p| p.zone_bounds());
    let inside = match (analysis.zone_bounds(), parent_zone) {
        (Some(own), Some(parent)) => ranges_overlap(own, parent),
        _ => false,
    };
    analysis.inside_parent_zone = Some(inside);

    let parent_signal = parent.and_then(|p| p.signal.clone());
    if !inside || analysis.signal != parent_signal {
        analysis.signal = Some(Signal::Wait);
    }
    if analysis.zone_type.is_none() {
        analysis.zone_type = parent.and_then(|p| p.zone_type.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GEOMETRY;
    use crate::geometry::{ChartRect, TextNode};
    use std::path::PathBuf;

    /// Pivot highs 1.1050 < 1.1080 < 1.1110, pivot lows 1.0995 < 1.1020 < 1.1050,
    /// ending with a bullish bar engulfing a bearish one
    fn uptrend_series() -> OhlcvSeries {
        let bars = [
            (1.1000, 1.1010, 1.0990, 1.1005),
            (1.1005, 1.1030, 1.1000, 1.1025),
            (1.1025, 1.1050, 1.1020, 1.1035),
            (1.1035, 1.1040, 1.1010, 1.1015),
            (1.1015, 1.1025, 1.0995, 1.1020),
            (1.1020, 1.1035, 1.1005, 1.1030),
            (1.1030, 1.1060, 1.1030, 1.1055),
            (1.1055, 1.1080, 1.1050, 1.1065),
            (1.1065, 1.1070, 1.1040, 1.1045),
            (1.1045, 1.1050, 1.1020, 1.1040),
            (1.1040, 1.1065, 1.1035, 1.1060),
            (1.1060, 1.1090, 1.1060, 1.1085),
            (1.1085, 1.1110, 1.1080, 1.1095),
            (1.1095, 1.1100, 1.1070, 1.1075),
            (1.1075, 1.1085, 1.1050, 1.1060),
            (1.1078, 1.1082, 1.1060, 1.1065),
            (1.1062, 1.1095, 1.1058, 1.1085),
        ];
        let candles: Vec<Candle> = bars
            .iter()
            .map(|&(o, h, l, c)| Candle::new(o, h, l, c, 100.0))
            .collect();
        OhlcvSeries::from_candles("EURUSD", "1D", 86_400_000, 0, &candles)
    }

    fn ctx<'a>(
        inst: &'a Instrument,
        tf: &'a TimeframeSpec,
        role: TimeframeRole,
        parent: Option<&'a TimeframeAnalysis>,
    ) -> HeuristicContext<'a> {
        HeuristicContext {
            instrument: inst,
            timeframe: tf,
            role,
            parent,
            confidence: 0.3,
            geometry: &GEOMETRY,
        }
    }

    #[test]
    fn test_series_uptrend_gives_support_buy() {
        let inst = Instrument::new("EURUSD");
        let tf = TimeframeSpec::new("1D", 120);
        let data = CaptureData::Series(uptrend_series());
        let analysis =
            heuristic_analysis(&data, &ctx(&inst, &tf, TimeframeRole::Primary, None)).unwrap();

        assert_eq!(analysis.trend, Some(Trend::Uptrend));
        assert_eq!(analysis.zone_type, Some(ZoneType::Support));
        assert_eq!(analysis.pattern.as_deref(), Some("bullish_engulfing"));
        assert_eq!(analysis.signal, Some(Signal::Buy));
        assert_eq!(analysis.source, AnalysisSource::Fallback);
        assert_eq!(analysis.confidence, Some(0.3));
        // Lower wick of the last pivot low
        assert_eq!(analysis.zone_bounds(), Some((1.1060, 1.1050)));
        assert!(analysis.inside_parent_zone.is_none());
    }

    #[test]
    fn test_entry_outside_parent_is_wait() {
        let inst = Instrument::new("EURUSD");
        let tf = TimeframeSpec::new("30", 200);
        let parent = TimeframeAnalysis {
            signal: Some(Signal::Buy),
            zone_high: Some(1.2000),
            zone_low: Some(1.1950),
            ..Default::default()
        };
        let data = CaptureData::Series(uptrend_series());
        let analysis =
            heuristic_analysis(&data, &ctx(&inst, &tf, TimeframeRole::Entry, Some(&parent)))
                .unwrap();
        assert_eq!(analysis.inside_parent_zone, Some(false));
        assert_eq!(analysis.signal, Some(Signal::Wait));
    }

    #[test]
    fn test_too_few_bars_is_an_error() {
        let inst = Instrument::new("EURUSD");
        let tf = TimeframeSpec::new("1D", 120);
        let series = uptrend_series().tail(3);
        let result = heuristic_analysis(
            &CaptureData::Series(series),
            &ctx(&inst, &tf, TimeframeRole::Primary, None),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_screenshot_mode_uses_middle_ticks() {
        let inst = Instrument::new("EURUSD");
        let tf = TimeframeSpec::new("1D", 120);
        let shot = ChartScreenshot {
            path: PathBuf::from("EURUSD_1D.png"),
            chart_rect: ChartRect::new(0.0, 0.0, 1000.0, 500.0),
            price_labels: vec![
                TextNode::new("1.1000", 950.0, 50.0),
                TextNode::new("1.0950", 950.0, 250.0),
                TextNode::new("1.0900", 950.0, 450.0),
            ],
            visible_range: None,
        };
        let analysis = heuristic_analysis(
            &CaptureData::Screenshot(shot),
            &ctx(&inst, &tf, TimeframeRole::Primary, None),
        )
        .unwrap();
        assert_eq!(analysis.signal, Some(Signal::Wait));
        assert_eq!(analysis.zone_bounds(), Some((1.095, 1.09)));
        assert_eq!(analysis.chart_price_high, Some(1.1));
    }

    #[test]
    fn test_screenshot_without_ticks_fails() {
        let inst = Instrument::new("EURUSD");
        let tf = TimeframeSpec::new("1D", 120);
        let shot = ChartScreenshot {
            path: PathBuf::from("EURUSD_1D.png"),
            chart_rect: ChartRect::new(0.0, 0.0, 1000.0, 500.0),
            price_labels: vec![TextNode::new("1.1000", 950.0, 50.0)],
            visible_range: None,
        };
        assert!(
            heuristic_analysis(
                &CaptureData::Screenshot(shot),
                &ctx(&inst, &tf, TimeframeRole::Primary, None)
            )
            .is_err()
        );
    }
}
