use std::panic::{AssertUnwindSafe, catch_unwind};

use anyhow::Result;

#[cfg(debug_assertions)]
use crate::config::DEBUG_FLAGS;

/// Checkpoints a run passes through, in order
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Start {
        instrument: String,
        strategy: String,
    },
    Captured {
        timeframes: Vec<String>,
    },
    Analyzing {
        timeframe: String,
        role: &'static str,
    },
    Rendering {
        overlays: usize,
    },
    Done {
        valid: bool,
    },
}

impl ProgressEvent {
    pub fn checkpoint(&self) -> &'static str {
        match self {
            ProgressEvent::Start { .. } => "start",
            ProgressEvent::Captured { .. } => "captured",
            ProgressEvent::Analyzing { .. } => "analyzing",
            ProgressEvent::Rendering { .. } => "rendering",
            ProgressEvent::Done { .. } => "done",
        }
    }
}

impl std::fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ProgressEvent::Start {
                instrument,
                strategy,
            } => write!(f, "Starting {} analysis of {}", strategy, instrument),
            ProgressEvent::Captured { timeframes } => {
                write!(f, "Captured {}", timeframes.join(", "))
            }
            ProgressEvent::Analyzing { timeframe, role } => {
                write!(f, "Analyzing {} ({})", timeframe, role)
            }
            ProgressEvent::Rendering { overlays } => write!(f, "Rendering {} zone(s)", overlays),
            ProgressEvent::Done { valid } => write!(
                f,
                "Done: {}",
                if *valid { "valid setup" } else { "no valid setup" }
            ),
        }
    }
}

/// Receives progress events. Failures here never affect the run.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent) -> Result<()>;
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) -> Result<()> + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) -> Result<()> {
        self(event)
    }
}

/// Deliver an event, swallowing sink errors and panics
pub fn emit(sink: Option<&dyn ProgressSink>, event: ProgressEvent) {
    #[cfg(debug_assertions)]
    if DEBUG_FLAGS.print_progress {
        log::info!("[{}] {}", event.checkpoint(), event);
    }

    let Some(sink) = sink else {
        return;
    };
    match catch_unwind(AssertUnwindSafe(|| sink.on_progress(&event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::debug!("Progress sink rejected '{}': {:#}", event.checkpoint(), e),
        Err(_) => log::debug!("Progress sink panicked on '{}'", event.checkpoint()),
    }
}
