pub mod core;
pub mod errors;
pub mod progress;
pub mod retry;
pub mod session;

// Re-export key components
pub use core::SignalEngine;
pub use errors::{PipelineError, Stage, StageFailure};
pub use progress::{ProgressEvent, ProgressSink, emit};
pub use retry::{with_fallback, with_retry, with_timeout};
pub use session::{
    InMemorySessionStore, SelectionStep, SessionError, SessionStore, handle_input,
};
