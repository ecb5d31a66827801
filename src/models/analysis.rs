use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Instrument, TimeframeSpec};

// ============================================================================
// Labels
// ============================================================================

/// Generates a label enum that keeps unknown text instead of failing to parse,
/// so validation can report it as a finding rather than the provider boundary
/// rejecting the whole response.
macro_rules! label_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $canonical:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Unrecognized(String),
        }

        impl $name {
            pub fn parse_label(text: &str) -> Self {
                let normalized = text.trim().to_lowercase().replace([' ', '-'], "_");
                match normalized.as_str() {
                    $($canonical $(| $alias)* => $name::$variant,)+
                    _ => $name::Unrecognized(text.trim().to_string()),
                }
            }

            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $canonical,)+
                    $name::Unrecognized(text) => text.as_str(),
                }
            }

            pub fn is_recognized(&self) -> bool {
                !matches!(self, $name::Unrecognized(_))
            }

            /// Canonical labels, for prompts and error messages
            pub fn allowed() -> &'static [&'static str] {
                &[$($canonical),+]
            }
        }

        impl From<String> for $name {
            fn from(text: String) -> Self {
                $name::parse_label(&text)
            }
        }

        impl From<$name> for String {
            fn from(label: $name) -> Self {
                label.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

label_enum! {
    /// Market structure: higher highs/lows, lower highs/lows, or neither
    Trend {
        Uptrend => "uptrend" | "up" | "bullish",
        Downtrend => "downtrend" | "down" | "bearish",
        Sideways => "sideways" | "range" | "ranging" | "neutral",
    }
}

label_enum! {
    Signal {
        Buy => "buy" | "long",
        Sell => "sell" | "short",
        Wait => "wait" | "hold" | "none" | "no_trade",
    }
}

label_enum! {
    ZoneType {
        Support => "support" | "demand",
        Resistance => "resistance" | "supply",
    }
}

/// Direction a candlestick pattern name implies, read from its prefix
/// ("bullish_engulfing" -> Buy, "bearish_pin_bar" -> Sell).
pub fn pattern_bias(pattern: &str) -> Option<Signal> {
    let p = pattern.trim().to_lowercase();
    if p.starts_with("bullish") || p == "hammer" || p == "morning_star" {
        Some(Signal::Buy)
    } else if p.starts_with("bearish") || p == "shooting_star" || p == "evening_star" {
        Some(Signal::Sell)
    } else {
        None
    }
}

/// Where a TimeframeAnalysis came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    #[default]
    Ai,
    /// Offline heuristic used while the AI provider was unavailable; approximate.
    Fallback,
}

// ============================================================================
// TimeframeAnalysis
// ============================================================================

/// Structured interpretation of one timeframe. Field names follow the JSON the
/// model is asked to return (camelCase), with snake_case accepted as aliases.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeAnalysis {
    // Provenance, filled in by the pipeline rather than the model
    #[serde(default)]
    pub instrument: String,
    #[serde(default)]
    pub timeframe: String,
    #[serde(default)]
    pub source: AnalysisSource,

    pub trend: Option<Trend>,
    #[serde(alias = "micro_trend")]
    pub micro_trend: Option<Trend>,
    pub signal: Option<Signal>,
    pub pattern: Option<String>,
    #[serde(alias = "zone_type")]
    pub zone_type: Option<ZoneType>,
    #[serde(alias = "zone_high")]
    pub zone_high: Option<f64>,
    #[serde(alias = "zone_low")]
    pub zone_low: Option<f64>,
    pub confidence: Option<f64>,
    #[serde(alias = "reason")]
    pub reasoning: Option<String>,
    #[serde(alias = "inside_parent_zone")]
    pub inside_parent_zone: Option<bool>,
    /// Visible price range of the chart the model looked at, when it can read it
    #[serde(alias = "chart_price_high")]
    pub chart_price_high: Option<f64>,
    #[serde(alias = "chart_price_low")]
    pub chart_price_low: Option<f64>,
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response is not parseable JSON: {0}")]
    NotJson(String),
    #[error("response JSON is not an object (got {0})")]
    NotAnObject(&'static str),
    #[error("response does not match the analysis schema")]
    Schema(#[from] serde_json::Error),
    #[error("field '{field}' has out-of-range value {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

impl TimeframeAnalysis {
    /// Provider boundary: turn the model's JSON into an analysis or reject it.
    /// Confidence given as a whole percentage (0-100) is rescaled to [0, 1].
    pub fn from_response(
        value: Value,
        instrument: &Instrument,
        timeframe: &TimeframeSpec,
    ) -> Result<Self, ResponseError> {
        if !value.is_object() {
            return Err(ResponseError::NotAnObject(json_kind(&value)));
        }
        let mut analysis: TimeframeAnalysis = serde_json::from_value(value)?;

        if let Some(conf) = analysis.confidence {
            analysis.confidence = Some(normalize_confidence(conf)?);
        }
        for (field, value) in [
            ("zoneHigh", analysis.zone_high),
            ("zoneLow", analysis.zone_low),
            ("chartPriceHigh", analysis.chart_price_high),
            ("chartPriceLow", analysis.chart_price_low),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(ResponseError::OutOfRange { field, value: v });
                }
            }
        }

        analysis.instrument = instrument.symbol.clone();
        analysis.timeframe = timeframe.id().to_string();
        analysis.source = AnalysisSource::Ai;
        Ok(analysis)
    }

    /// Zone bounds ordered as (high, low), if both were emitted
    pub fn zone_bounds(&self) -> Option<(f64, f64)> {
        match (self.zone_high, self.zone_low) {
            (Some(a), Some(b)) => Some((a.max(b), a.min(b))),
            _ => None,
        }
    }

    pub fn visible_range(&self) -> Option<(f64, f64)> {
        match (self.chart_price_high, self.chart_price_low) {
            (Some(h), Some(l)) if h > l => Some((h, l)),
            _ => None,
        }
    }

    pub fn has_pattern(&self) -> bool {
        self.pattern
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty() && p.trim().to_lowercase() != "none")
    }

    pub fn is_fallback(&self) -> bool {
        self.source == AnalysisSource::Fallback
    }
}

fn normalize_confidence(conf: f64) -> Result<f64, ResponseError> {
    if !conf.is_finite() || conf < 0.0 || conf > 100.0 {
        return Err(ResponseError::OutOfRange {
            field: "confidence",
            value: conf,
        });
    }
    if conf <= 1.0 {
        return Ok(conf);
    }
    // Above 1 only whole percentages are accepted
    if conf.fract() != 0.0 {
        return Err(ResponseError::OutOfRange {
            field: "confidence",
            value: conf,
        });
    }
    log::debug!("Rescaling percentage confidence {}", conf);
    Ok(conf / 100.0)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Pull the JSON object out of free-form model text.
/// Accepts bare JSON, ```json fenced blocks, or an object embedded in prose.
pub fn extract_json_object(text: &str) -> Result<Value, ResponseError> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let unfenced = strip_code_fence(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (unfenced.find('{'), unfenced.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&unfenced[start..=end]) {
                return Ok(value);
            }
        }
    }

    let preview: String = trimmed.chars().take(80).collect();
    Err(ResponseError::NotJson(preview))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line ("json")
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
