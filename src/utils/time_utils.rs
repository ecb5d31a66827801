use chrono::{DateTime, Utc};

pub struct TimeUtils;

impl TimeUtils {
    pub const MS_IN_S: i64 = 1000;
    pub const MS_IN_MIN: i64 = Self::MS_IN_S * 60;
    pub const MS_IN_5_MIN: i64 = Self::MS_IN_S * 60 * 5;
    pub const MS_IN_15_MIN: i64 = Self::MS_IN_S * 60 * 15;
    pub const MS_IN_30_MIN: i64 = Self::MS_IN_S * 60 * 30;
    pub const MS_IN_H: i64 = Self::MS_IN_MIN * 60;
    pub const MS_IN_4_H: i64 = Self::MS_IN_MIN * 60 * 4;
    pub const MS_IN_D: i64 = Self::MS_IN_H * 24;
    pub const MS_IN_W: i64 = Self::MS_IN_D * 7;
    pub const STANDARD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
    /// Filesystem-safe stamp used in report ids and render filenames, to the millisecond
    pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%3f";

    /// Convert interval in milliseconds to the shorthand used in filenames (e.g. `30m`, `1d`).
    pub fn interval_to_string(interval_ms: i64) -> &'static str {
        match interval_ms {
            Self::MS_IN_MIN => "1m",
            Self::MS_IN_5_MIN => "5m",
            Self::MS_IN_15_MIN => "15m",
            Self::MS_IN_30_MIN => "30m",
            Self::MS_IN_H => "1h",
            Self::MS_IN_4_H => "4h",
            Self::MS_IN_D => "1d",
            Self::MS_IN_W => "1w",
            _ => "unknown",
        }
    }

    /// Resolve a chart timeframe identifier to its interval.
    /// Bare numbers are minutes ("30" = 30 minutes), letters mark hours/days/weeks.
    pub fn timeframe_to_interval_ms(identifier: &str) -> Option<i64> {
        let id = identifier.trim().to_uppercase();
        if id.is_empty() {
            return None;
        }

        let (digits, unit) = match id.find(|c: char| !c.is_ascii_digit()) {
            Some(pos) => id.split_at(pos),
            None => (id.as_str(), ""),
        };
        // "D" alone means one day
        let count: i64 = if digits.is_empty() {
            1
        } else {
            digits.parse().ok()?
        };
        if count <= 0 {
            return None;
        }

        let unit_ms = match unit {
            "" | "M" | "MIN" => Self::MS_IN_MIN,
            "H" => Self::MS_IN_H,
            "D" => Self::MS_IN_D,
            "W" => Self::MS_IN_W,
            _ => return None,
        };
        Some(count * unit_ms)
    }
}

pub fn file_stamp(dt: &DateTime<Utc>) -> String {
    dt.format(TimeUtils::FILE_STAMP_FORMAT).to_string()
}

pub fn epoch_ms_to_utc(epoch_ms: i64) -> String {
    // Used for display purposes
    match DateTime::from_timestamp_millis(epoch_ms) {
        Some(dt) => dt.format(TimeUtils::STANDARD_TIME_FORMAT).to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_identifiers() {
        assert_eq!(
            TimeUtils::timeframe_to_interval_ms("1D"),
            Some(TimeUtils::MS_IN_D)
        );
        assert_eq!(
            TimeUtils::timeframe_to_interval_ms("30"),
            Some(TimeUtils::MS_IN_30_MIN)
        );
        assert_eq!(
            TimeUtils::timeframe_to_interval_ms("4h"),
            Some(TimeUtils::MS_IN_4_H)
        );
        assert_eq!(TimeUtils::timeframe_to_interval_ms("D"), Some(TimeUtils::MS_IN_D));
        assert_eq!(TimeUtils::timeframe_to_interval_ms("0"), None);
        assert_eq!(TimeUtils::timeframe_to_interval_ms("1X"), None);
        assert_eq!(TimeUtils::timeframe_to_interval_ms(""), None);
    }

    #[test]
    fn test_file_stamp_has_millisecond_precision() {
        let dt = DateTime::from_timestamp_millis(1_792_420_200_250).unwrap();
        let stamp = file_stamp(&dt);
        assert!(stamp.ends_with("_250"), "{}", stamp);
        assert!(!stamp.contains(['.', ':', ' ']));
    }

    #[test]
    fn test_interval_round_trip_names() {
        let ms = TimeUtils::timeframe_to_interval_ms("15").unwrap();
        assert_eq!(TimeUtils::interval_to_string(ms), "15m");
    }
}
