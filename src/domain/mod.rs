pub mod candle;
pub mod instrument;
pub mod timeframe;

// Re-export commonly used types
pub use candle::{Candle, CandleType};
pub use instrument::{Instrument, InstrumentClass};
pub use timeframe::{TimeframeRole, TimeframeSpec};
