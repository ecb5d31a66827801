use crate::config::PipBand;
use crate::domain::Instrument;
use crate::utils::maths_utils::round_to;

/// Where a zone's width falls relative to a strategy's pip band
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipCheck {
    WithinBand { pips: f64 },
    TooNarrow { pips: f64, min_pips: f64 },
    TooWide { pips: f64, max_pips: f64 },
}

impl PipCheck {
    pub fn pips(&self) -> f64 {
        match *self {
            PipCheck::WithinBand { pips }
            | PipCheck::TooNarrow { pips, .. }
            | PipCheck::TooWide { pips, .. } => pips,
        }
    }

    pub fn is_within(&self) -> bool {
        matches!(self, PipCheck::WithinBand { .. })
    }

    /// Warning text, or None when inside the band
    pub fn describe(&self) -> Option<String> {
        match *self {
            PipCheck::WithinBand { .. } => None,
            PipCheck::TooNarrow { pips, min_pips } => Some(format!(
                "zone width {:.1} pips is narrower than the {:.0} pip minimum",
                pips, min_pips
            )),
            PipCheck::TooWide { pips, max_pips } => Some(format!(
                "zone width {:.1} pips is wider than the {:.0} pip maximum",
                pips, max_pips
            )),
        }
    }
}

/// Absolute price distance in pips, rounded to one decimal
pub fn price_to_pips(distance: f64, instrument: &Instrument) -> f64 {
    round_to(distance.abs() / instrument.pip_size(), 1)
}

/// Bounds may be given in either order
pub fn check_zone_width(high: f64, low: f64, instrument: &Instrument, band: &PipBand) -> PipCheck {
    let pips = price_to_pips(high - low, instrument);
    if pips < band.min_pips {
        PipCheck::TooNarrow {
            pips,
            min_pips: band.min_pips,
        }
    } else if pips > band.max_pips {
        PipCheck::TooWide {
            pips,
            max_pips: band.max_pips,
        }
    } else {
        PipCheck::WithinBand { pips }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SCALPING, SWING};

    #[test]
    fn test_pips_per_instrument_class() {
        assert_eq!(price_to_pips(1.1050 - 1.1020, &Instrument::new("EURUSD")), 30.0);
        assert_eq!(price_to_pips(150.25 - 150.00, &Instrument::new("USDJPY")), 25.0);
        assert_eq!(price_to_pips(2351.5 - 2350.0, &Instrument::new("XAUUSD")), 15.0);
        assert_eq!(price_to_pips(19850.0 - 19830.0, &Instrument::new("NAS100")), 20.0);
    }

    #[test]
    fn test_band_boundaries() {
        let eurusd = Instrument::new("EURUSD");
        assert!(check_zone_width(1.1050, 1.1020, &eurusd, &SWING.pip_band).is_within());
        assert!(matches!(
            check_zone_width(1.1050, 1.1020, &eurusd, &SCALPING.pip_band),
            PipCheck::TooWide { .. }
        ));
        let narrow = check_zone_width(1.1022, 1.1020, &eurusd, &SWING.pip_band);
        assert!(matches!(narrow, PipCheck::TooNarrow { .. }));
        assert!(narrow.describe().unwrap().contains("2.0 pips"));
        // Swapped bounds give the same width
        assert_eq!(
            check_zone_width(1.1020, 1.1050, &eurusd, &SWING.pip_band).pips(),
            30.0
        );
    }
}
