pub mod analysis;
pub mod combined;
pub mod series;
pub mod validation;

pub use analysis::{
    AnalysisSource, ResponseError, Signal, TimeframeAnalysis, Trend, ZoneType,
    extract_json_object, pattern_bias,
};
pub use combined::{CombinedAnalysis, RunArtifacts, ZoneColor, ZoneDescriptor};
pub use series::OhlcvSeries;
pub use validation::{ValidationReport, ValidationResult};
