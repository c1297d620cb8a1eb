// Helper functions for safe logging and timestamp handling

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Masks email addresses for safe logging
///
/// # Example
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        _ => "***@***.***".to_string(),
    }
}

/// Canonical storage format for timestamps: RFC 3339, UTC, second precision
///
/// Values in this format sort lexicographically in SQL.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RFC 3339 timestamp in any offset and normalizes it to UTC
///
/// Fractions of a second are dropped so the value is exactly what
/// `format_timestamp` will store.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc).trunc_subsecs(0))
}

pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_safe_email_log() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("nope"), "***@***.***");
        assert_eq!(safe_email_log("@example.com"), "***@***.***");
    }

    #[test]
    fn test_timestamp_normalizes_offset() {
        let parsed = parse_timestamp("2026-03-01T10:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap());
        assert_eq!(format_timestamp(&parsed), "2026-03-01T08:30:00Z");
    }

    #[test]
    fn test_timestamp_drops_subseconds() {
        let parsed = parse_timestamp("2026-03-01T10:00:00.800Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap());
        assert_eq!(parsed, parse_timestamp("2026-03-01T10:00:00.200Z").unwrap());
    }

    #[test]
    fn test_timestamp_rejects_garbage() {
        assert!(parse_timestamp("tomorrow at noon").is_err());
    }
}
