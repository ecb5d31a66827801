//! Strategy policies: which timeframes to look at, what to ask the model,
//! how to judge each answer and how to fold both answers into one verdict.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::config::{AppConfig, StrategySettings};
use crate::domain::{Instrument, TimeframeRole, TimeframeSpec};
use crate::models::{CombinedAnalysis, TimeframeAnalysis, ValidationResult};

pub mod prompts;
pub mod rules;
pub mod scalping;
pub mod swing;

pub use rules::CONTAINMENT_ERROR;
pub use scalping::ScalpingPolicy;
pub use swing::SwingPolicy;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::EnumIter,
    strum_macros::EnumString,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StrategyKind {
    Swing,
    Scalping,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StrategyError {
    #[error("the {0} prompt needs the completed primary analysis as context")]
    MissingContext(&'static str),
}

pub trait StrategyPolicy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn settings(&self) -> &StrategySettings;

    /// [primary/context, entry/confirmation]
    fn timeframes(&self) -> [TimeframeSpec; 2] {
        let settings = self.settings();
        [settings.primary.clone(), settings.entry.clone()]
    }

    fn timeframe(&self, role: TimeframeRole) -> TimeframeSpec {
        let [primary, entry] = self.timeframes();
        match role {
            TimeframeRole::Primary => primary,
            TimeframeRole::Entry => entry,
        }
    }

    /// Instructions for one timeframe. The entry prompt needs the primary result.
    fn build_prompt(
        &self,
        role: TimeframeRole,
        instrument: &Instrument,
        context: Option<&TimeframeAnalysis>,
    ) -> Result<String, StrategyError> {
        match (role, context) {
            (TimeframeRole::Primary, _) => Ok(prompts::primary_prompt(
                self.kind(),
                self.settings(),
                instrument,
            )),
            (TimeframeRole::Entry, Some(primary)) => Ok(prompts::entry_prompt(
                self.kind(),
                self.settings(),
                instrument,
                primary,
            )),
            (TimeframeRole::Entry, None) => Err(StrategyError::MissingContext(role.name())),
        }
    }

    /// Pure: the same analysis always yields the same result
    fn validate(&self, role: TimeframeRole, result: &TimeframeAnalysis) -> ValidationResult;

    fn combine(&self, primary: TimeframeAnalysis, entry: TimeframeAnalysis) -> CombinedAnalysis {
        let primary_validation = self.validate(TimeframeRole::Primary, &primary);
        let entry_validation = self.validate(TimeframeRole::Entry, &entry);
        let [primary_tf, entry_tf] = self.timeframes();
        rules::combine_results(
            self.kind(),
            (&primary_tf, primary, primary_validation),
            (&entry_tf, entry, entry_validation),
        )
    }
}

/// Name -> policy lookup, built once from configuration
pub struct StrategyRegistry {
    policies: Vec<Arc<dyn StrategyPolicy>>,
}

impl StrategyRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        let policies = StrategyKind::iter()
            .map(|kind| -> Arc<dyn StrategyPolicy> {
                match kind {
                    StrategyKind::Swing => Arc::new(SwingPolicy::new(config.swing.clone())),
                    StrategyKind::Scalping => {
                        Arc::new(ScalpingPolicy::new(config.scalping.clone()))
                    }
                }
            })
            .collect();
        StrategyRegistry { policies }
    }

    /// Case-insensitive
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn StrategyPolicy>> {
        let kind: StrategyKind = name.trim().parse().ok()?;
        self.policies.iter().find(|p| p.kind() == kind).cloned()
    }

    pub fn policies(&self) -> &[Arc<dyn StrategyPolicy>] {
        &self.policies
    }

    pub fn names(&self) -> Vec<String> {
        self.policies.iter().map(|p| p.kind().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = StrategyRegistry::from_config(&AppConfig::default());
        assert_eq!(registry.resolve("SWING").map(|p| p.kind()), Some(StrategyKind::Swing));
        assert_eq!(
            registry.resolve(" Scalping ").map(|p| p.kind()),
            Some(StrategyKind::Scalping)
        );
        assert!(registry.resolve("martingale").is_none());
        assert_eq!(registry.names(), vec!["swing".to_string(), "scalping".to_string()]);
    }

    #[test]
    fn test_timeframes_follow_configuration() {
        let mut config = AppConfig::default();
        config.swing.entry = TimeframeSpec::new("60", 150);
        let registry = StrategyRegistry::from_config(&config);
        let swing = registry.resolve("swing").unwrap();
        let [primary, entry] = swing.timeframes();
        assert_eq!(primary.id(), "1D");
        assert_eq!(entry.id(), "60");
        assert_eq!(swing.timeframe(TimeframeRole::Entry).bars_requested, 150);
    }

    #[test]
    fn test_entry_prompt_requires_context() {
        let registry = StrategyRegistry::from_config(&AppConfig::default());
        let swing = registry.resolve("swing").unwrap();
        let result = swing.build_prompt(TimeframeRole::Entry, &Instrument::new("EURUSD"), None);
        assert_eq!(result, Err(StrategyError::MissingContext("entry")));
    }
}
