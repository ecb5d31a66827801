use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::utils::TimeUtils;

/// One sampling interval a strategy asks for, with how many bars to look back.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeframeSpec {
    /// Chart identifier, e.g. "1D", "30", "15", "5"
    pub identifier: Cow<'static, str>,
    pub bars_requested: usize,
}

impl TimeframeSpec {
    pub const fn new(identifier: &'static str, bars_requested: usize) -> Self {
        Self {
            identifier: Cow::Borrowed(identifier),
            bars_requested,
        }
    }

    pub fn id(&self) -> &str {
        &self.identifier
    }

    pub fn interval_ms(&self) -> Option<i64> {
        TimeUtils::timeframe_to_interval_ms(&self.identifier)
    }

    /// Human label, e.g. "1D" -> "1d", "30" -> "30m"
    pub fn label(&self) -> String {
        match self.interval_ms() {
            Some(ms) if TimeUtils::interval_to_string(ms) != "unknown" => {
                TimeUtils::interval_to_string(ms).to_string()
            }
            _ => self.identifier.to_string(),
        }
    }
}

impl std::fmt::Display for TimeframeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} ({} bars)", self.label(), self.bars_requested)
    }
}

/// Position of a timeframe within a strategy's pair.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeframeRole {
    /// Higher timeframe: trend, zone and context
    Primary,
    /// Lower timeframe: confirmation inside the primary zone
    Entry,
}

impl TimeframeRole {
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(TimeframeRole::Primary),
            1 => Some(TimeframeRole::Entry),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            TimeframeRole::Primary => 0,
            TimeframeRole::Entry => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimeframeRole::Primary => "primary",
            TimeframeRole::Entry => "entry",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(TimeframeSpec::new("1D", 120).label(), "1d");
        assert_eq!(TimeframeSpec::new("30", 200).label(), "30m");
        assert_eq!(TimeframeSpec::new("weird", 10).label(), "weird");
    }

    #[test]
    fn test_role_index_round_trip() {
        assert_eq!(TimeframeRole::from_index(0), Some(TimeframeRole::Primary));
        assert_eq!(TimeframeRole::from_index(1).map(|r| r.index()), Some(1));
        assert_eq!(TimeframeRole::from_index(2), None);
    }
}
