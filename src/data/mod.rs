// External collaborators: chart capture, AI analysis, report persistence
pub mod capture;
pub mod provider;
pub mod reports;

// Re-export commonly used types
pub use capture::{
    CaptureData, CaptureHandle, CaptureProvider, ChartScreenshot, ScreenshotDirCapture,
    ScreenshotSidecar, SeriesFileCapture,
};
pub use provider::{AnalysisProvider, ChatCompletionsProvider, OfflineProvider};
pub use reports::{JsonReportSink, ReportSink};
