//! Chat-style selection flow: market, then pair, then strategy.

use std::collections::HashMap;
use std::sync::Mutex;

use itertools::Itertools;
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::domain::Instrument;
use crate::strategy::StrategyKind;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("no session '{0}'")]
    UnknownSession(String),

    #[error("'{input}' is not a valid {step} (choose one of: {options})")]
    InvalidChoice {
        step: &'static str,
        input: String,
        options: String,
    },

    #[error("selection is already complete; reset to start over")]
    AlreadyComplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStep {
    ChooseMarket,
    ChoosePair { market: &'static str },
    ChooseStrategy { market: &'static str, symbol: String },
    Ready { symbol: String, strategy: StrategyKind },
}

impl SelectionStep {
    pub fn prompt(&self) -> &'static str {
        match self {
            SelectionStep::ChooseMarket => "market",
            SelectionStep::ChoosePair { .. } => "pair",
            SelectionStep::ChooseStrategy { .. } => "strategy",
            SelectionStep::Ready { .. } => "confirmation",
        }
    }

    /// Choices offered at this step, in display order
    pub fn options(&self, instruments: &[Instrument]) -> Vec<String> {
        match self {
            SelectionStep::ChooseMarket => instruments
                .iter()
                .map(|i| i.class.label())
                .unique()
                .map(str::to_string)
                .collect(),
            SelectionStep::ChoosePair { market } => instruments
                .iter()
                .filter(|i| i.class.label() == *market)
                .map(|i| i.symbol.clone())
                .collect(),
            SelectionStep::ChooseStrategy { .. } => {
                StrategyKind::iter().map(|k| k.to_string()).collect()
            }
            SelectionStep::Ready { .. } => Vec::new(),
        }
    }

    /// Consume one answer. Input is matched case-insensitively.
    pub fn advance(&self, input: &str, instruments: &[Instrument]) -> Result<Self, SessionError> {
        let input = input.trim();
        let invalid = || SessionError::InvalidChoice {
            step: self.prompt(),
            input: input.to_string(),
            options: self.options(instruments).join(", "),
        };

        match self {
            SelectionStep::ChooseMarket => instruments
                .iter()
                .map(|i| i.class.label())
                .find(|label| label.eq_ignore_ascii_case(input))
                .map(|market| SelectionStep::ChoosePair { market })
                .ok_or_else(invalid),
            SelectionStep::ChoosePair { market } => {
                let wanted = Instrument::new(input);
                instruments
                    .iter()
                    .find(|i| i.class.label() == *market && i.symbol == wanted.symbol)
                    .map(|i| SelectionStep::ChooseStrategy {
                        market: *market,
                        symbol: i.symbol.clone(),
                    })
                    .ok_or_else(invalid)
            }
            SelectionStep::ChooseStrategy { symbol, .. } => input
                .parse::<StrategyKind>()
                .map(|strategy| SelectionStep::Ready {
                    symbol: symbol.clone(),
                    strategy,
                })
                .map_err(|_| invalid()),
            SelectionStep::Ready { .. } => Err(SessionError::AlreadyComplete),
        }
    }
}

/// Per-conversation selection state
pub trait SessionStore: Send + Sync {
    /// Start (or restart) a session at the first step
    fn create(&self, session_id: &str) -> SelectionStep;

    fn get(&self, session_id: &str) -> Option<SelectionStep>;

    fn update(&self, session_id: &str, step: SelectionStep) -> Result<(), SessionError>;

    /// Drop a session. Returns whether one existed.
    fn reset(&self, session_id: &str) -> bool;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SelectionStep>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<String, SelectionStep>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, session_id: &str) -> SelectionStep {
        let step = SelectionStep::ChooseMarket;
        self.sessions().insert(session_id.to_string(), step.clone());
        step
    }

    fn get(&self, session_id: &str) -> Option<SelectionStep> {
        self.sessions().get(session_id).cloned()
    }

    fn update(&self, session_id: &str, step: SelectionStep) -> Result<(), SessionError> {
        match self.sessions().get_mut(session_id) {
            Some(current) => {
                *current = step;
                Ok(())
            }
            None => Err(SessionError::UnknownSession(session_id.to_string())),
        }
    }

    fn reset(&self, session_id: &str) -> bool {
        self.sessions().remove(session_id).is_some()
    }
}

/// Apply one answer to a stored session and persist the new step.
/// A rejected answer leaves the session where it was.
pub fn handle_input(
    store: &dyn SessionStore,
    session_id: &str,
    input: &str,
    instruments: &[Instrument],
) -> Result<SelectionStep, SessionError> {
    let current = store
        .get(session_id)
        .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
    let next = current.advance(input, instruments)?;
    store.update(session_id, next.clone())?;
    log::debug!("Session {} moved to {}", session_id, next.prompt());
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruments() -> Vec<Instrument> {
        ["EURUSD", "USDJPY", "XAUUSD", "BTCUSDT"]
            .iter()
            .map(|s| Instrument::new(s))
            .collect()
    }

    #[test]
    fn test_full_selection_flow() {
        let store = InMemorySessionStore::new();
        let list = instruments();
        assert_eq!(store.create("chat-1"), SelectionStep::ChooseMarket);

        let step = handle_input(&store, "chat-1", "forex", &list).unwrap();
        assert_eq!(step, SelectionStep::ChoosePair { market: "Forex" });
        assert_eq!(step.options(&list), vec!["EURUSD", "USDJPY"]);

        let step = handle_input(&store, "chat-1", "usd/jpy", &list).unwrap();
        assert_eq!(
            step,
            SelectionStep::ChooseStrategy {
                market: "Forex",
                symbol: "USDJPY".to_string()
            }
        );

        let step = handle_input(&store, "chat-1", "Scalping", &list).unwrap();
        assert_eq!(
            step,
            SelectionStep::Ready {
                symbol: "USDJPY".to_string(),
                strategy: StrategyKind::Scalping
            }
        );
        assert_eq!(store.get("chat-1"), Some(step));
        assert_eq!(
            handle_input(&store, "chat-1", "swing", &list),
            Err(SessionError::AlreadyComplete)
        );
    }

    #[test]
    fn test_market_options_are_unique() {
        let list = instruments();
        assert_eq!(
            SelectionStep::ChooseMarket.options(&list),
            vec!["Forex", "Metals", "Crypto"]
        );
    }

    #[test]
    fn test_rejected_answer_keeps_the_step() {
        let store = InMemorySessionStore::new();
        let list = instruments();
        store.create("chat-2");
        handle_input(&store, "chat-2", "metals", &list).unwrap();

        // EURUSD exists but not in the chosen market
        let err = handle_input(&store, "chat-2", "EURUSD", &list).unwrap_err();
        assert!(err.to_string().contains("XAUUSD"));
        assert_eq!(
            store.get("chat-2"),
            Some(SelectionStep::ChoosePair { market: "Metals" })
        );
    }

    #[test]
    fn test_unknown_and_reset_sessions() {
        let store = InMemorySessionStore::new();
        let list = instruments();
        assert_eq!(
            handle_input(&store, "ghost", "forex", &list),
            Err(SessionError::UnknownSession("ghost".to_string()))
        );
        store.create("chat-3");
        assert!(store.reset("chat-3"));
        assert!(!store.reset("chat-3"));
        assert!(store.get("chat-3").is_none());
        assert!(store.update("chat-3", SelectionStep::ChooseMarket).is_err());
    }
}
