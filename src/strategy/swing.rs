use super::{StrategyKind, StrategyPolicy, rules};
use crate::config::StrategySettings;
use crate::domain::TimeframeRole;
use crate::models::{TimeframeAnalysis, ValidationResult};

/// Daily context, 30 minute confirmation
pub struct SwingPolicy {
    settings: StrategySettings,
}

impl SwingPolicy {
    pub fn new(settings: StrategySettings) -> Self {
        Self { settings }
    }
}

impl StrategyPolicy for SwingPolicy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Swing
    }

    fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    fn validate(&self, role: TimeframeRole, result: &TimeframeAnalysis) -> ValidationResult {
        match role {
            TimeframeRole::Primary => rules::validate_primary(result, &self.settings).finish(),
            TimeframeRole::Entry => {
                let mut report = rules::validate_entry(result, &self.settings);
                // Entry bounds are optional for swing, but if given they must describe a range
                if let (Some(high), Some(low)) = (result.zone_high, result.zone_low) {
                    if high == low {
                        report.warn(format!("entry zone bounds collapsed at {}", high));
                    }
                }
                report.finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SWING;
    use crate::models::{Signal, Trend, ZoneType};
    use crate::strategy::CONTAINMENT_ERROR;
    use proptest::prelude::*;

    fn eurusd_primary() -> TimeframeAnalysis {
        TimeframeAnalysis {
            instrument: "EURUSD".to_string(),
            timeframe: "1D".to_string(),
            trend: Some(Trend::Uptrend),
            signal: Some(Signal::Buy),
            pattern: Some("bullish_engulfing".to_string()),
            zone_high: Some(1.1050),
            zone_low: Some(1.1020),
            confidence: Some(0.8),
            ..Default::default()
        }
    }

    fn eurusd_entry(inside: Option<bool>) -> TimeframeAnalysis {
        TimeframeAnalysis {
            instrument: "EURUSD".to_string(),
            timeframe: "30".to_string(),
            pattern: Some("bullish_engulfing".to_string()),
            inside_parent_zone: inside,
            confidence: Some(0.75),
            ..Default::default()
        }
    }

    fn policy() -> SwingPolicy {
        SwingPolicy::new(SWING)
    }

    #[test]
    fn test_aligned_setup_is_valid_with_mean_confidence() {
        let combined = policy().combine(eurusd_primary(), eurusd_entry(Some(true)));
        assert!(combined.valid, "errors: {:?}", combined.errors);
        assert!((combined.confidence - 0.775).abs() < 1e-12);
        assert_eq!(combined.signal, Some(Signal::Buy));
        assert_eq!(combined.strategy, "swing");
        assert_eq!(combined.instrument, "EURUSD");
        assert!(combined.errors.is_empty());
    }

    #[test]
    fn test_entry_outside_parent_zone_invalidates() {
        let entry = TimeframeAnalysis {
            inside_parent_zone: Some(false),
            ..Default::default()
        };
        let combined = policy().combine(eurusd_primary(), entry);
        assert!(!combined.valid);
        assert!(
            combined
                .errors
                .iter()
                .any(|e| e == &format!("30: {}", CONTAINMENT_ERROR))
        );
        // Missing entry confidence counts as zero
        assert!((combined.confidence - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_missing_containment_flag_is_not_inside() {
        let combined = policy().combine(eurusd_primary(), eurusd_entry(None));
        assert!(!combined.valid);
        assert!(combined.entry_validation.errors().contains(&CONTAINMENT_ERROR.to_string()));
    }

    #[test]
    fn test_trend_signal_contradiction_is_an_error() {
        let primary = TimeframeAnalysis {
            signal: Some(Signal::Sell),
            ..eurusd_primary()
        };
        let result = policy().validate(TimeframeRole::Primary, &primary);
        assert!(!result.is_valid());
        assert!(result.errors().iter().any(|e| e.contains("contradiction")));
        assert!(!result.warnings().iter().any(|w| w.contains("contradiction")));

        // Regardless of a perfect entry
        let combined = policy().combine(primary, eurusd_entry(Some(true)));
        assert!(!combined.valid);
    }

    #[test]
    fn test_primary_missing_fields_and_unknown_labels() {
        let primary = TimeframeAnalysis {
            trend: Some(Trend::Unrecognized("choppy".to_string())),
            ..Default::default()
        };
        let result = policy().validate(TimeframeRole::Primary, &primary);
        let errors = result.errors().join("\n");
        assert!(errors.contains("missing required field 'signal'"));
        assert!(errors.contains("missing required field 'zoneHigh'"));
        assert!(errors.contains("missing required field 'confidence'"));
        assert!(errors.contains("unrecognized trend 'choppy'"));
    }

    #[test]
    fn test_soft_findings_are_warnings() {
        let primary = TimeframeAnalysis {
            confidence: Some(0.4),
            zone_type: Some(ZoneType::Resistance),
            zone_high: Some(1.1020),
            zone_low: Some(1.1120), // swapped, 100 pips wide
            ..eurusd_primary()
        };
        let result = policy().validate(TimeframeRole::Primary, &primary);
        assert!(result.is_valid(), "errors: {:?}", result.errors());
        let warnings = result.warnings().join("\n");
        assert!(warnings.contains("below the 0.60 threshold"));
        assert!(warnings.contains("wider than the 80 pip maximum"));
        assert!(warnings.contains("bullish pattern 'bullish_engulfing' at a resistance zone"));
        assert!(warnings.contains("bounds were swapped"));
    }

    #[test]
    fn test_collapsed_bounds() {
        let primary = TimeframeAnalysis {
            zone_low: Some(1.1050),
            ..eurusd_primary()
        };
        assert!(!policy().validate(TimeframeRole::Primary, &primary).is_valid());

        let entry = TimeframeAnalysis {
            zone_high: Some(1.1030),
            zone_low: Some(1.1030),
            ..eurusd_entry(Some(true))
        };
        let result = policy().validate(TimeframeRole::Entry, &entry);
        assert!(result.is_valid());
        assert!(result.warnings().iter().any(|w| w.contains("collapsed")));
    }

    #[test]
    fn test_non_overlapping_zones_warn() {
        let entry = TimeframeAnalysis {
            zone_high: Some(1.0990),
            zone_low: Some(1.0980),
            ..eurusd_entry(Some(true))
        };
        let combined = policy().combine(eurusd_primary(), entry);
        assert!(combined.warnings.iter().any(|w| w.contains("does not overlap")));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let p = policy();
        let primary = TimeframeAnalysis {
            signal: Some(Signal::Wait),
            ..eurusd_primary()
        };
        assert_eq!(
            p.validate(TimeframeRole::Primary, &primary),
            p.validate(TimeframeRole::Primary, &primary)
        );
        let entry = eurusd_entry(Some(false));
        assert_eq!(
            p.validate(TimeframeRole::Entry, &entry),
            p.validate(TimeframeRole::Entry, &entry)
        );
    }

    proptest! {
        #[test]
        fn prop_never_valid_outside_parent_zone(
            primary_conf in 0.0f64..=1.0,
            entry_conf in 0.0f64..=1.0,
            flag in proptest::option::of(Just(false)),
        ) {
            let primary = TimeframeAnalysis { confidence: Some(primary_conf), ..eurusd_primary() };
            let entry = TimeframeAnalysis { confidence: Some(entry_conf), ..eurusd_entry(flag) };
            let combined = policy().combine(primary, entry);
            prop_assert!(!combined.valid);
        }
    }
}
