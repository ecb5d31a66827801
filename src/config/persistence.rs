//! File persistence configuration

use chrono::{DateTime, Utc};

use crate::utils::time_utils::file_stamp;

/// Directory for JSON report snapshots
pub const REPORTS_DIR: &str = "reports";

/// Directory for rendered overlay charts
pub const RENDERS_DIR: &str = "renders";

/// Default directory searched by the file-backed capture providers
pub const CAPTURE_DIR: &str = "captures";

/// Version stamped into every report so older snapshots can be told apart
pub const REPORT_VERSION: f64 = 1.0;

/// Example: "EURUSD_swing_20261019_143000_250"
pub fn report_id(symbol: &str, strategy: &str, at: &DateTime<Utc>) -> String {
    format!("{}_{}_{}", symbol, strategy, file_stamp(at))
}

/// Capture files are looked up as "{SYMBOL}_{timeframe}.{ext}", e.g. "EURUSD_1D.json"
pub fn capture_stem(symbol: &str, timeframe: &str) -> String {
    format!("{}_{}", symbol, timeframe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_report_ids_within_one_second_differ() {
        let first = Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 0).unwrap();
        let second = first + Duration::milliseconds(1);

        let a = report_id("EURUSD", "swing", &first);
        let b = report_id("EURUSD", "swing", &second);
        assert_eq!(a, "EURUSD_swing_20261019_143000_000");
        assert_eq!(b, "EURUSD_swing_20261019_143000_001");
    }
}
