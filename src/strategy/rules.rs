//! Validation and combination rules shared by every policy.

use super::StrategyKind;
use crate::analysis::pips::check_zone_width;
use crate::config::StrategySettings;
use crate::domain::{Instrument, TimeframeSpec};
use crate::models::{
    CombinedAnalysis, Signal, TimeframeAnalysis, Trend, ValidationReport, ValidationResult,
    ZoneType, pattern_bias,
};
use crate::utils::maths_utils::{mean, ranges_overlap};

/// The one entry finding that invalidates a whole setup
pub const CONTAINMENT_ERROR: &str =
    "containment rule violated: entry pattern is not inside the primary zone (insideParentZone is not true)";

pub fn validate_primary(result: &TimeframeAnalysis, settings: &StrategySettings) -> ValidationReport {
    let mut report = ValidationReport::new();

    for (field, present) in [
        ("trend", result.trend.is_some()),
        ("signal", result.signal.is_some()),
        ("zoneHigh", result.zone_high.is_some()),
        ("zoneLow", result.zone_low.is_some()),
        ("confidence", result.confidence.is_some()),
    ] {
        if !present {
            report.error(format!("missing required field '{}'", field));
        }
    }

    if let Some(Trend::Unrecognized(text)) = &result.trend {
        report.error(format!(
            "unrecognized trend '{}' (expected one of {})",
            text,
            Trend::allowed().join(", ")
        ));
    }
    if let Some(Signal::Unrecognized(text)) = &result.signal {
        report.error(format!(
            "unrecognized signal '{}' (expected one of {})",
            text,
            Signal::allowed().join(", ")
        ));
    }
    if let Some(ZoneType::Unrecognized(text)) = &result.zone_type {
        report.warn(format!("unrecognized zone type '{}'", text));
    }

    match (&result.trend, &result.signal) {
        (Some(Trend::Uptrend), Some(Signal::Sell)) | (Some(Trend::Downtrend), Some(Signal::Buy)) => {
            report.error(format!(
                "trend-signal contradiction: {} signal in a {}",
                result.signal.as_ref().map_or("", Signal::as_str),
                result.trend.as_ref().map_or("", Trend::as_str)
            ));
        }
        _ => {}
    }

    if let (Some(high), Some(low)) = (result.zone_high, result.zone_low) {
        if !high.is_finite() || !low.is_finite() {
            report.error(format!("zone bounds are not finite ({}, {})", high, low));
        } else if high == low {
            report.error(format!("zone bounds collapsed: high equals low ({})", high));
        } else {
            if high < low {
                report.warn(format!(
                    "zoneHigh {} is below zoneLow {}; bounds were swapped",
                    high, low
                ));
            }
            let instrument = Instrument::new(&result.instrument);
            if let Some(message) = check_zone_width(high, low, &instrument, &settings.pip_band).describe()
            {
                report.warn(message);
            }
        }
    }

    if let Some(conf) = result.confidence {
        if conf < settings.min_confidence {
            report.warn(low_confidence(conf, settings.min_confidence));
        }
    }

    if let (Some(pattern), Some(zone_type)) = (&result.pattern, &result.zone_type) {
        match (pattern_bias(pattern), zone_type) {
            (Some(Signal::Buy), ZoneType::Resistance) => {
                report.warn(format!("bullish pattern '{}' at a resistance zone", pattern))
            }
            (Some(Signal::Sell), ZoneType::Support) => {
                report.warn(format!("bearish pattern '{}' at a support zone", pattern))
            }
            _ => {}
        }
    }

    if result.signal == Some(Signal::Wait) {
        report.warn("signal is wait: no trade on this timeframe");
    }

    report
}

pub fn validate_entry(result: &TimeframeAnalysis, settings: &StrategySettings) -> ValidationReport {
    let mut report = ValidationReport::new();

    if !result.has_pattern() {
        report.error("entry timeframe reported no confirming pattern");
    }
    if result.inside_parent_zone != Some(true) {
        report.error(CONTAINMENT_ERROR);
    }

    if let (Some(pattern), Some(signal)) = (&result.pattern, &result.signal) {
        if let Some(bias) = pattern_bias(pattern) {
            if matches!(signal, Signal::Buy | Signal::Sell) && bias != *signal {
                report.warn(format!("pattern '{}' disagrees with {} signal", pattern, signal));
            }
        }
    }

    match result.confidence {
        None => report.warn("entry confidence missing (counted as 0)"),
        Some(conf) if conf < settings.min_confidence => {
            report.warn(low_confidence(conf, settings.min_confidence))
        }
        Some(_) => {}
    }

    report
}

fn low_confidence(conf: f64, min: f64) -> String {
    format!("confidence {:.2} is below the {:.2} threshold", conf, min)
}

/// Fold both timeframes into the verdict. Findings are prefixed with their timeframe.
pub fn combine_results(
    kind: StrategyKind,
    primary: (&TimeframeSpec, TimeframeAnalysis, ValidationResult),
    entry: (&TimeframeSpec, TimeframeAnalysis, ValidationResult),
) -> CombinedAnalysis {
    let (primary_tf, primary, primary_validation) = primary;
    let (entry_tf, entry, entry_validation) = entry;

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (tf, validation) in [
        (primary_tf.id(), &primary_validation),
        (entry_tf.id(), &entry_validation),
    ] {
        errors.extend(validation.errors().iter().map(|e| format!("{}: {}", tf, e)));
        warnings.extend(validation.warnings().iter().map(|w| format!("{}: {}", tf, w)));
    }

    if let (Some(p), Some(e)) = (primary.zone_bounds(), entry.zone_bounds()) {
        if !ranges_overlap(p, e) {
            warnings.push(format!(
                "{} zone does not overlap the {} zone",
                entry_tf.id(),
                primary_tf.id()
            ));
        }
    }
    for (tf, analysis) in [(primary_tf.id(), &primary), (entry_tf.id(), &entry)] {
        if analysis.is_fallback() {
            warnings.push(format!("{}: offline heuristic result, levels are approximate", tf));
        }
    }

    let valid = primary_validation.is_valid()
        && entry_validation.is_valid()
        && entry.inside_parent_zone == Some(true);
    let confidence = mean(&[
        primary.confidence.unwrap_or(0.0),
        entry.confidence.unwrap_or(0.0),
    ]);

    let instrument = if primary.instrument.is_empty() {
        entry.instrument.clone()
    } else {
        primary.instrument.clone()
    };

    CombinedAnalysis::new(
        &instrument,
        &kind.to_string(),
        valid,
        confidence,
        primary,
        entry,
        primary_validation,
        entry_validation,
        errors,
        warnings,
    )
}
