use super::{StrategyKind, StrategyPolicy, rules};
use crate::config::StrategySettings;
use crate::domain::TimeframeRole;
use crate::models::{Signal, TimeframeAnalysis, Trend, ValidationResult};

/// 15 minute context, 5 minute confirmation
pub struct ScalpingPolicy {
    settings: StrategySettings,
}

impl ScalpingPolicy {
    pub fn new(settings: StrategySettings) -> Self {
        Self { settings }
    }
}

impl StrategyPolicy for ScalpingPolicy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Scalping
    }

    fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    fn validate(&self, role: TimeframeRole, result: &TimeframeAnalysis) -> ValidationResult {
        match role {
            TimeframeRole::Primary => rules::validate_primary(result, &self.settings).finish(),
            TimeframeRole::Entry => {
                let mut report = rules::validate_entry(result, &self.settings);
                match (&result.micro_trend, &result.signal) {
                    (Some(Trend::Downtrend), Some(Signal::Buy))
                    | (Some(Trend::Uptrend), Some(Signal::Sell)) => {
                        report.warn(format!(
                            "micro-trend {} runs against the {} entry",
                            result.micro_trend.as_ref().map_or("", Trend::as_str),
                            result.signal.as_ref().map_or("", Signal::as_str)
                        ));
                    }
                    _ => {}
                }
                report.finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SCALPING;

    fn primary() -> TimeframeAnalysis {
        TimeframeAnalysis {
            instrument: "EURUSD".to_string(),
            trend: Some(Trend::Downtrend),
            signal: Some(Signal::Sell),
            pattern: Some("bearish_engulfing".to_string()),
            zone_high: Some(1.1060),
            zone_low: Some(1.1050),
            confidence: Some(0.7),
            ..Default::default()
        }
    }

    fn entry() -> TimeframeAnalysis {
        TimeframeAnalysis {
            instrument: "EURUSD".to_string(),
            micro_trend: Some(Trend::Downtrend),
            signal: Some(Signal::Sell),
            pattern: Some("bearish_pin_bar".to_string()),
            zone_high: Some(1.1058),
            zone_low: Some(1.1054),
            inside_parent_zone: Some(true),
            confidence: Some(0.7),
            ..Default::default()
        }
    }

    #[test]
    fn test_aligned_scalp_is_valid() {
        let policy = ScalpingPolicy::new(SCALPING);
        let primary_result = policy.validate(TimeframeRole::Primary, &primary());
        assert!(primary_result.is_valid());
        // 10 pips sits inside the 4-20 band
        assert!(primary_result.warnings().is_empty(), "{:?}", primary_result.warnings());

        let combined = policy.combine(primary(), entry());
        assert!(combined.valid);
        assert!(combined.warnings.is_empty(), "{:?}", combined.warnings);
        assert_eq!(combined.strategy, "scalping");
    }

    #[test]
    fn test_micro_trend_against_entry_warns_only() {
        let policy = ScalpingPolicy::new(SCALPING);
        let entry = TimeframeAnalysis {
            micro_trend: Some(Trend::Uptrend),
            ..entry()
        };
        let result = policy.validate(TimeframeRole::Entry, &entry);
        assert!(result.is_valid());
        assert!(result.warnings().iter().any(|w| w.contains("micro-trend uptrend")));
    }

    #[test]
    fn test_pattern_signal_mismatch_warns() {
        let policy = ScalpingPolicy::new(SCALPING);
        let entry = TimeframeAnalysis {
            pattern: Some("bullish_engulfing".to_string()),
            ..entry()
        };
        let result = policy.validate(TimeframeRole::Entry, &entry);
        assert!(result.is_valid());
        assert!(result.warnings().iter().any(|w| w.contains("disagrees with sell")));
    }
}
