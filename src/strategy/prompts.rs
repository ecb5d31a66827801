use std::fmt::Write as _;

use super::StrategyKind;
use crate::config::StrategySettings;
use crate::domain::Instrument;
use crate::models::{Signal, TimeframeAnalysis, Trend, ZoneType};

const PRIMARY_SCHEMA: &str = r#"{
  "trend": "uptrend" | "downtrend" | "sideways",
  "signal": "buy" | "sell" | "wait",
  "pattern": string | null,
  "zoneType": "support" | "resistance",
  "zoneHigh": number,
  "zoneLow": number,
  "confidence": number (0.0 - 1.0),
  "chartPriceHigh": number | null,
  "chartPriceLow": number | null,
  "reasoning": string
}"#;

const ENTRY_SCHEMA: &str = r#"{
  "microTrend": "uptrend" | "downtrend" | "sideways",
  "signal": "buy" | "sell" | "wait",
  "pattern": string | null,
  "zoneHigh": number | null,
  "zoneLow": number | null,
  "insideParentZone": boolean,
  "confidence": number (0.0 - 1.0),
  "chartPriceHigh": number | null,
  "chartPriceLow": number | null,
  "reasoning": string
}"#;

fn style(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::Swing => "swing trader holding positions for several days",
        StrategyKind::Scalping => "scalper holding positions for minutes",
    }
}

pub fn primary_prompt(
    kind: StrategyKind,
    settings: &StrategySettings,
    instrument: &Instrument,
) -> String {
    let tf = settings.primary.label();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "You are a {} analysing {} on the {} chart ({} bars).",
        style(kind),
        instrument.symbol,
        tf,
        settings.primary.bars_requested
    );
    out.push_str(
        "\n1. TREND: compare the last swing highs and lows. Higher highs with higher lows is an \
         uptrend, lower highs with lower lows is a downtrend, anything else is sideways.\n\
         2. ZONE: pick the single best support or resistance zone. Break ties in this order: \
         most touched, most recent, cleanest rejection, closest to the current price.\n\
         3. PATTERN: find the strongest candlestick pattern at that zone. A bullish pattern only \
         counts at support, a bearish pattern only at resistance. Use snake_case names such as \
         bullish_engulfing or bearish_pin_bar, or null if there is none.\n\
         4. SIGNAL: buy when uptrend, support and a bullish pattern align; sell when downtrend, \
         resistance and a bearish pattern align; otherwise wait. Never sell in an uptrend or buy \
         in a downtrend.\n",
    );
    let _ = writeln!(
        out,
        "5. WIDTH: the zone must be between {:.0} and {:.0} pips wide (1 pip = {}).",
        settings.pip_band.min_pips,
        settings.pip_band.max_pips,
        instrument.pip_size()
    );
    let _ = writeln!(
        out,
        "6. If you can read the highest and lowest prices on the visible price axis, report them as chartPriceHigh/chartPriceLow."
    );
    let _ = writeln!(
        out,
        "\nRespond with a single JSON object and nothing else:\n{}",
        PRIMARY_SCHEMA
    );
    out
}

pub fn entry_prompt(
    kind: StrategyKind,
    settings: &StrategySettings,
    instrument: &Instrument,
    primary: &TimeframeAnalysis,
) -> String {
    let signal = primary.signal.clone().unwrap_or(Signal::Wait);
    let zone_type = primary
        .zone_type
        .as_ref()
        .map_or("zone", ZoneType::as_str);
    let zone = match primary.zone_bounds() {
        Some((high, low)) => format!(
            "{} - {}",
            instrument.format_price(low),
            instrument.format_price(high)
        ),
        None => "not reported".to_string(),
    };
    let wanted_pattern = match signal {
        Signal::Buy => "a bullish",
        Signal::Sell => "a bearish",
        _ => "any",
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "You are a {} confirming an entry on {} using the {} chart ({} bars).",
        style(kind),
        instrument.symbol,
        settings.entry.label(),
        settings.entry.bars_requested
    );
    let _ = writeln!(
        out,
        "\nThe {} chart gave: trend {}, signal {}, pattern {}, {} {}.",
        settings.primary.label(),
        primary.trend.as_ref().map_or("unknown", Trend::as_str),
        signal,
        primary.pattern.as_deref().unwrap_or("none"),
        zone_type,
        zone
    );
    let _ = writeln!(
        out,
        "\n1. Look for {} candlestick pattern located at or overlapping the {} zone {}.",
        wanted_pattern, zone_type, zone
    );
    out.push_str(
        "2. Set insideParentZone to true only if that pattern is inside or overlapping the zone \
         above, otherwise false.\n\
         3. Report the entry zone bounds of the confirming pattern and the short-term trend as \
         microTrend.\n\
         4. Signal must agree with the pattern direction; use wait if nothing confirms.\n",
    );
    let _ = writeln!(
        out,
        "\nRespond with a single JSON object and nothing else:\n{}",
        ENTRY_SCHEMA
    );
    out
}
