use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::domain::Candle;
use crate::utils::maths_utils::{get_max, get_min};
use crate::utils::time_utils::epoch_ms_to_utc;

// ============================================================================
// OhlcvSeries: columnar bars for one instrument at one timeframe
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OhlcvSeries {
    pub symbol: String,
    pub timeframe: String,
    pub interval_ms: i64,
    pub first_timestamp_ms: i64,

    // Prices
    pub open_prices: Vec<f64>,
    pub high_prices: Vec<f64>,
    pub low_prices: Vec<f64>,
    pub close_prices: Vec<f64>,

    pub volumes: Vec<f64>,
}

impl OhlcvSeries {
    pub fn from_candles(
        symbol: &str,
        timeframe: &str,
        interval_ms: i64,
        first_timestamp_ms: i64,
        candles: &[Candle],
    ) -> Self {
        OhlcvSeries {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            interval_ms,
            first_timestamp_ms,
            open_prices: candles.iter().map(|c| c.open_price).collect(),
            high_prices: candles.iter().map(|c| c.high_price).collect(),
            low_prices: candles.iter().map(|c| c.low_price).collect(),
            close_prices: candles.iter().map(|c| c.close_price).collect(),
            volumes: candles.iter().map(|c| c.volume).collect(),
        }
    }

    pub fn klines(&self) -> usize {
        self.open_prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_prices.is_empty()
    }

    pub fn candle(&self, idx: usize) -> Option<Candle> {
        if idx >= self.klines() {
            return None;
        }
        Some(Candle::new(
            self.open_prices[idx],
            self.high_prices[idx],
            self.low_prices[idx],
            self.close_prices[idx],
            self.volumes[idx],
        ))
    }

    pub fn candles(&self) -> impl Iterator<Item = Candle> + '_ {
        (0..self.klines()).filter_map(|i| self.candle(i))
    }

    pub fn last_close(&self) -> Option<f64> {
        self.close_prices.last().copied()
    }

    pub fn timestamp_ms(&self, idx: usize) -> i64 {
        self.first_timestamp_ms + idx as i64 * self.interval_ms
    }

    /// (highest high, lowest low) over the whole series
    pub fn price_range(&self) -> Option<(f64, f64)> {
        Some((get_max(&self.high_prices)?, get_min(&self.low_prices)?))
    }

    /// The most recent `n` bars as a new series
    pub fn tail(&self, n: usize) -> OhlcvSeries {
        let start = self.klines().saturating_sub(n);
        OhlcvSeries {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe.clone(),
            interval_ms: self.interval_ms,
            first_timestamp_ms: self.timestamp_ms(start),
            open_prices: self.open_prices[start..].to_vec(),
            high_prices: self.high_prices[start..].to_vec(),
            low_prices: self.low_prices[start..].to_vec(),
            close_prices: self.close_prices[start..].to_vec(),
            volumes: self.volumes[start..].to_vec(),
        }
    }

    /// Columns of equal length, finite prices, high >= low on every bar
    pub fn check_consistency(&self) -> Result<()> {
        let n = self.open_prices.len();
        if [
            self.high_prices.len(),
            self.low_prices.len(),
            self.close_prices.len(),
            self.volumes.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            bail!("{} {}: OHLCV columns have different lengths", self.symbol, self.timeframe);
        }
        for (i, candle) in self.candles().enumerate() {
            let prices = [
                candle.open_price,
                candle.high_price,
                candle.low_price,
                candle.close_price,
            ];
            if prices.iter().any(|p| !p.is_finite()) {
                bail!("{} {}: non-finite price at bar {}", self.symbol, self.timeframe, i);
            }
            if candle.high_price < candle.low_price {
                bail!("{} {}: high below low at bar {}", self.symbol, self.timeframe, i);
            }
        }
        Ok(())
    }

    /// CSV block pasted into prompts, oldest first
    pub fn to_prompt_csv(&self, max_bars: usize, decimals: usize) -> String {
        let view = self.tail(max_bars);
        let mut out = String::from("time,open,high,low,close,volume\n");
        for (i, c) in view.candles().enumerate() {
            out.push_str(&format!(
                "{},{:.d$},{:.d$},{:.d$},{:.d$},{:.0}\n",
                epoch_ms_to_utc(view.timestamp_ms(i)),
                c.open_price,
                c.high_price,
                c.low_price,
                c.close_price,
                c.volume,
                d = decimals
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OhlcvSeries {
        let candles = [
            Candle::new(1.10, 1.12, 1.09, 1.11, 100.0),
            Candle::new(1.11, 1.13, 1.10, 1.12, 120.0),
            Candle::new(1.12, 1.15, 1.11, 1.14, 90.0),
        ];
        OhlcvSeries::from_candles("EURUSD", "30", 1_800_000, 0, &candles)
    }

    #[test]
    fn test_price_range_and_tail() {
        let series = sample();
        assert_eq!(series.price_range(), Some((1.15, 1.09)));

        let tail = series.tail(2);
        assert_eq!(tail.klines(), 2);
        assert_eq!(tail.first_timestamp_ms, 1_800_000);
        assert_eq!(tail.last_close(), Some(1.14));
        assert_eq!(series.tail(10).klines(), 3);
    }

    #[test]
    fn test_candle_out_of_range_is_none() {
        assert!(sample().candle(3).is_none());
        assert_eq!(sample().candle(0).map(|c| c.volume), Some(100.0));
    }

    #[test]
    fn test_consistency_check() {
        let mut series = sample();
        assert!(series.check_consistency().is_ok());
        series.low_prices[1] = 2.0;
        assert!(series.check_consistency().is_err());
        series.low_prices.pop();
        assert!(series.check_consistency().is_err());
    }

    #[test]
    fn test_prompt_csv_has_header_and_rows() {
        let csv = sample().to_prompt_csv(2, 4);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "time,open,high,low,close,volume");
        assert!(lines[2].contains("1.1400"));
    }
}
