//! Strategy and validation configuration

use serde::{Deserialize, Serialize};

use crate::domain::TimeframeSpec;

/// Acceptable zone width, in pips, for a strategy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipBand {
    pub min_pips: f64,
    pub max_pips: f64,
}

/// Everything a strategy policy reads at run time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySettings {
    /// Higher/context timeframe
    pub primary: TimeframeSpec,
    /// Lower/confirmation timeframe
    pub entry: TimeframeSpec,
    // Confidence below this is reported as a warning, never an error
    pub min_confidence: f64,
    pub pip_band: PipBand,
}

pub const SWING: StrategySettings = StrategySettings {
    primary: TimeframeSpec::new("1D", 120),
    entry: TimeframeSpec::new("30", 200),
    min_confidence: 0.6,
    pip_band: PipBand {
        min_pips: 15.0,
        max_pips: 80.0,
    },
};

pub const SCALPING: StrategySettings = StrategySettings {
    primary: TimeframeSpec::new("15", 200),
    entry: TimeframeSpec::new("5", 240),
    min_confidence: 0.65,
    pip_band: PipBand {
        min_pips: 4.0,
        max_pips: 20.0,
    },
};

/// Instruments offered by the CLI and the selection session
pub const DEFAULT_INSTRUMENTS: &[&str] = &[
    "EURUSD", "GBPUSD", "USDJPY", "AUDUSD", "XAUUSD", "NAS100", "US30", "BTCUSDT", "ETHUSDT",
];
