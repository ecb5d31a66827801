// Offline analysis: pip arithmetic and the fallback heuristic
pub mod fallback;
pub mod pips;

// Re-export commonly used types
pub use fallback::{HeuristicContext, heuristic_analysis};
pub use pips::{PipCheck, check_zone_width, price_to_pips};
