//! Configuration module for the signal pipeline.

pub mod analysis;
pub mod app_config;

mod debug; // Private: use crate::config::DEBUG_FLAGS, not crate::config::debug::DEBUG_FLAGS
pub use debug::DEBUG_FLAGS;

pub mod geometry;
pub mod persistence;
pub mod provider;
pub mod retry;

// Re-export commonly used items
pub use analysis::{DEFAULT_INSTRUMENTS, PipBand, SCALPING, SWING, StrategySettings};
pub use app_config::{AppConfig, PersistenceSettings};
pub use geometry::{GEOMETRY, GeometrySettings, ZONE_PALETTE};
pub use persistence::{REPORT_VERSION, capture_stem, report_id};
pub use provider::{PROVIDER, ProviderSettings};
pub use retry::{
    FALLBACK, FallbackSettings, RETRY, RetryPolicy, RetrySettings, TIMEOUTS, TimeoutSettings,
};
