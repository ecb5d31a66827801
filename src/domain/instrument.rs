use serde::{Deserialize, Serialize};

/// Broad instrument families. Pip size and plausible price magnitude depend on this.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    Forex,
    ForexJpy,
    Metal,
    /// XAG quotes two orders of magnitude below gold and moves in cents
    Silver,
    Index,
    Crypto,
}

impl InstrumentClass {
    /// Classify a symbol such as "EURUSD", "USD/JPY", "XAUUSD", "NAS100" or "BTCUSDT".
    pub fn classify(symbol: &str) -> Self {
        static METALS: &[&str] = &["XAU", "XPT", "XPD"];
        static INDICES: &[&str] = &[
            "US30", "US100", "US500", "NAS100", "SPX500", "GER40", "DE40", "UK100", "JP225",
            "FRA40", "AUS200",
        ];
        static CRYPTO_QUOTES: &[&str] = &["USDT", "USDC", "FDUSD", "BUSD"];
        static CRYPTO_BASES: &[&str] = &["BTC", "ETH", "SOL", "XRP", "BNB", "ADA", "DOGE"];

        let name = normalize_symbol(symbol);

        if name.starts_with("XAG") {
            return InstrumentClass::Silver;
        }
        if METALS.iter().any(|m| name.starts_with(m)) {
            return InstrumentClass::Metal;
        }
        if INDICES.iter().any(|i| name == *i) {
            return InstrumentClass::Index;
        }
        if CRYPTO_QUOTES.iter().any(|q| name.ends_with(q))
            || CRYPTO_BASES.iter().any(|b| name.starts_with(b))
        {
            return InstrumentClass::Crypto;
        }
        if name.len() == 6 && name.chars().all(|c| c.is_ascii_alphabetic()) {
            if name.contains("JPY") {
                return InstrumentClass::ForexJpy;
            }
            return InstrumentClass::Forex;
        }
        // Anything ending in digits that isn't a known index is treated as an index CFD
        if name.chars().last().is_some_and(|c| c.is_ascii_digit()) {
            return InstrumentClass::Index;
        }
        InstrumentClass::Forex
    }

    /// Minimal price increment used to express zone width
    pub fn pip_size(self) -> f64 {
        match self {
            InstrumentClass::Forex => 0.0001,
            InstrumentClass::ForexJpy => 0.01,
            InstrumentClass::Metal => 0.1,
            InstrumentClass::Silver => 0.01,
            InstrumentClass::Index => 1.0,
            InstrumentClass::Crypto => 1.0,
        }
    }

    /// Inclusive (low, high) magnitude band that a genuine price for this class can fall in.
    /// Axis labels outside it are not price ticks (volume, dates, indicator values).
    pub fn price_band(self) -> (f64, f64) {
        match self {
            InstrumentClass::Forex => (0.05, 50.0),
            InstrumentClass::ForexJpy => (10.0, 1_000.0),
            InstrumentClass::Metal => (1.0, 10_000.0),
            InstrumentClass::Silver => (1.0, 1_000.0),
            InstrumentClass::Index => (100.0, 100_000.0),
            InstrumentClass::Crypto => (0.000_000_01, 10_000_000.0),
        }
    }

    /// Decimal places used when printing prices of this class
    pub fn price_decimals(self) -> usize {
        match self {
            InstrumentClass::Forex => 5,
            InstrumentClass::ForexJpy => 3,
            InstrumentClass::Metal => 2,
            InstrumentClass::Silver => 3,
            InstrumentClass::Index => 1,
            InstrumentClass::Crypto => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InstrumentClass::Forex | InstrumentClass::ForexJpy => "Forex",
            InstrumentClass::Metal | InstrumentClass::Silver => "Metals",
            InstrumentClass::Index => "Indices",
            InstrumentClass::Crypto => "Crypto",
        }
    }
}

fn normalize_symbol(symbol: &str) -> String {
    symbol
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instrument {
    pub symbol: String,
    pub class: InstrumentClass,
}

impl Instrument {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            class: InstrumentClass::classify(symbol),
        }
    }

    pub fn pip_size(&self) -> f64 {
        self.class.pip_size()
    }

    pub fn format_price(&self, price: f64) -> String {
        format!("{:.*}", self.class.price_decimals(), price)
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({})", self.symbol, self.class.label())
    }
}
