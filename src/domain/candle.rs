// Define the CandleType enum
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CandleType {
    Bullish,
    Bearish,
}

/// A single OHLCV bar, assembled on demand from a columnar series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(
        open_price: f64,
        high_price: f64,
        low_price: f64,
        close_price: f64,
        volume: f64,
    ) -> Self {
        Candle {
            open_price,
            high_price,
            low_price,
            close_price,
            volume,
        }
    }

    pub fn get_type(&self) -> CandleType {
        if self.close_price >= self.open_price {
            CandleType::Bullish
        } else {
            CandleType::Bearish
        }
    }

    // Returns the low and high of the candle body as a tuple
    pub fn body_range(&self) -> (f64, f64) {
        match self.get_type() {
            CandleType::Bullish => (self.open_price, self.close_price),
            CandleType::Bearish => (self.close_price, self.open_price),
        }
    }

    pub fn body_size(&self) -> f64 {
        (self.close_price - self.open_price).abs()
    }

    // Calculates the low of the bottom wick.
    pub fn low_wick_low(&self) -> f64 {
        self.low_price
    }

    // Calculates the high of the bottom wick.
    pub fn low_wick_high(&self) -> f64 {
        self.body_range().0
    }

    // Calculates the low of the top wick.
    pub fn high_wick_low(&self) -> f64 {
        self.body_range().1
    }

    // Calculates the high of the top wick.
    pub fn high_wick_high(&self) -> f64 {
        self.high_price
    }

    /// `self` is a bullish body that fully covers the bearish body of `previous`
    pub fn is_bullish_engulfing(&self, previous: &Candle) -> bool {
        let (prev_low, prev_high) = previous.body_range();
        let (body_low, body_high) = self.body_range();
        previous.get_type() == CandleType::Bearish
            && self.get_type() == CandleType::Bullish
            && self.body_size() > previous.body_size()
            && body_low <= prev_low
            && body_high >= prev_high
    }

    /// `self` is a bearish body that fully covers the bullish body of `previous`
    pub fn is_bearish_engulfing(&self, previous: &Candle) -> bool {
        let (prev_low, prev_high) = previous.body_range();
        let (body_low, body_high) = self.body_range();
        previous.get_type() == CandleType::Bullish
            && self.get_type() == CandleType::Bearish
            && self.body_size() > previous.body_size()
            && body_low <= prev_low
            && body_high >= prev_high
    }
}
