//! Price-axis tick discovery from the chart's text nodes.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{ChartRect, GeometryError, PriceAxis};
use crate::config::GeometrySettings;
use crate::domain::InstrumentClass;
use crate::utils::maths_utils::relative_diff;

/// A piece of text found on the chart surface, positioned in page pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

impl TextNode {
    pub fn new(text: &str, x: f64, y: f64) -> Self {
        TextNode {
            text: text.to_string(),
            x,
            y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTick {
    pub price: f64,
    pub y: f64,
}

/// Parses a label only when the whole text is a price:
/// "1.0850", "1,234.5" and "19850" are accepted; "EURUSD 1.08" or "1.08%" are not.
pub fn parse_price_label(text: &str) -> Option<f64> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    if let Some(frac) = frac_part {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    if int_part.is_empty() {
        return None;
    }

    let digits: String = if int_part.contains(',') {
        let groups: Vec<&str> = int_part.split(',').collect();
        let first_ok = (1..=3).contains(&groups[0].len());
        let rest_ok = groups[1..].iter().all(|g| g.len() == 3);
        if !first_ok || !rest_ok || !groups.iter().all(|g| g.bytes().all(|b| b.is_ascii_digit())) {
            return None;
        }
        groups.concat()
    } else {
        if !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        int_part.to_string()
    };

    let normalized = match frac_part {
        Some(frac) => format!("{}.{}", digits, frac),
        None => digits,
    };
    normalized.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Price labels on the right-hand axis strip, sorted ascending by price,
/// with near-duplicates (same label drawn twice) merged.
pub fn discover_ticks(
    rect: &ChartRect,
    nodes: &[TextNode],
    class: InstrumentClass,
    settings: &GeometrySettings,
) -> Vec<PriceTick> {
    let strip_left = rect.right() - settings.axis_strip_px;
    let (band_low, band_high) = class.price_band();

    nodes
        .iter()
        .filter(|node| node.x >= strip_left && rect.contains_y(node.y))
        .filter_map(|node| {
            parse_price_label(&node.text).map(|price| PriceTick { price, y: node.y })
        })
        .filter(|tick| tick.price >= band_low && tick.price <= band_high)
        .sorted_by(|a, b| a.price.total_cmp(&b.price))
        .coalesce(|prev, next| {
            if relative_diff(next.price, prev.price) <= settings.tick_dedup_tolerance_pct {
                Ok(prev)
            } else {
                Err((prev, next))
            }
        })
        .collect()
}

/// Linear map anchored on the lowest and highest discovered ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickScale {
    low: PriceTick,
    high: PriceTick,
}

impl TickScale {
    pub fn from_ticks(ticks: &[PriceTick]) -> Result<Self, GeometryError> {
        if ticks.len() < 2 {
            return Err(GeometryError::InsufficientTicks { found: ticks.len() });
        }
        let low = ticks
            .iter()
            .copied()
            .min_by(|a, b| a.price.total_cmp(&b.price))
            .ok_or(GeometryError::InsufficientTicks { found: 0 })?;
        let high = ticks
            .iter()
            .copied()
            .max_by(|a, b| a.price.total_cmp(&b.price))
            .ok_or(GeometryError::InsufficientTicks { found: 0 })?;

        if high.price == low.price || high.y == low.y {
            return Err(GeometryError::DegenerateTicks);
        }
        Ok(TickScale { low, high })
    }

    pub fn low(&self) -> PriceTick {
        self.low
    }

    pub fn high(&self) -> PriceTick {
        self.high
    }
}

impl PriceAxis for TickScale {
    fn y_for(&self, price: f64) -> f64 {
        let slope = (self.high.y - self.low.y) / (self.high.price - self.low.price);
        self.low.y + (price - self.low.price) * slope
    }

    fn price_at(&self, y: f64) -> f64 {
        let slope = (self.high.price - self.low.price) / (self.high.y - self.low.y);
        self.low.price + (y - self.low.y) * slope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GEOMETRY;
    use proptest::prelude::*;

    fn rect() -> ChartRect {
        ChartRect::new(0.0, 0.0, 1000.0, 500.0)
    }

    #[test]
    fn test_parse_accepts_whole_prices_only() {
        assert_eq!(parse_price_label("1.0850"), Some(1.085));
        assert_eq!(parse_price_label(" 19850 "), Some(19850.0));
        assert_eq!(parse_price_label("1,234.50"), Some(1234.5));
        assert_eq!(parse_price_label("12,345,678"), Some(12_345_678.0));

        assert_eq!(parse_price_label("EURUSD 1.08"), None);
        assert_eq!(parse_price_label("1.08%"), None);
        assert_eq!(parse_price_label("1,23.5"), None);
        assert_eq!(parse_price_label("1."), None);
        assert_eq!(parse_price_label(".5"), None);
        assert_eq!(parse_price_label("-1.5"), None);
        assert_eq!(parse_price_label(""), None);
    }

    #[test]
    fn test_discover_filters_strip_band_and_duplicates() {
        let nodes = vec![
            TextNode::new("1.1000", 950.0, 50.0),
            TextNode::new("1.0950", 950.0, 250.0),
            TextNode::new("1.09501", 955.0, 251.0), // same label rendered twice
            TextNode::new("1.0900", 950.0, 450.0),
            TextNode::new("1.0925", 300.0, 350.0),  // inside the plot, not the axis
            TextNode::new("1.0975", 950.0, 600.0),  // below the rect
            TextNode::new("2024", 950.0, 480.0),    // outside the forex price band
            TextNode::new("Volume", 950.0, 490.0),
        ];
        let ticks = discover_ticks(&rect(), &nodes, InstrumentClass::Forex, &GEOMETRY);
        let prices: Vec<f64> = ticks.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![1.09, 1.095, 1.1]);
    }

    #[test]
    fn test_scale_requires_two_distinct_ticks() {
        let one = [PriceTick { price: 1.1, y: 10.0 }];
        assert_eq!(
            TickScale::from_ticks(&one),
            Err(GeometryError::InsufficientTicks { found: 1 })
        );

        let same_y = [PriceTick { price: 1.1, y: 10.0 }, PriceTick { price: 1.2, y: 10.0 }];
        assert_eq!(TickScale::from_ticks(&same_y), Err(GeometryError::DegenerateTicks));
    }

    #[test]
    fn test_scale_interpolates_between_ticks() {
        let ticks = [PriceTick { price: 1.09, y: 450.0 }, PriceTick { price: 1.10, y: 50.0 }];
        let scale = TickScale::from_ticks(&ticks).unwrap();
        assert!((scale.y_for(1.095) - 250.0).abs() < 1e-9);
        assert!((scale.price_at(250.0) - 1.095).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_higher_price_never_maps_lower_on_screen(
            low_price in 0.5f64..2.0,
            spread in 0.001f64..1.0,
            low_y in 200.0f64..500.0,
            height in 10.0f64..190.0,
            a in 0.0f64..1.0,
            b in 0.0f64..1.0,
        ) {
            let ticks = [
                PriceTick { price: low_price, y: low_y },
                PriceTick { price: low_price + spread, y: low_y - height },
            ];
            let scale = TickScale::from_ticks(&ticks).unwrap();
            let (pa, pb) = (low_price + a * spread, low_price + b * spread);
            if pa > pb {
                prop_assert!(scale.y_for(pa) <= scale.y_for(pb));
            }
            prop_assert!((scale.price_at(scale.y_for(pa)) - pa).abs() < 1e-9);
        }
    }
}
