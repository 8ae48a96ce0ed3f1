use chrono::{DateTime, NaiveDate, Utc};

use crate::CoreError;

/// Temporal and count bounds applied to one harvest.
///
/// The date bounds describe the window `since < t < until`. Items are
/// expected newest-first, so `until` is where taking starts and `since`
/// is where it stops. `limit` caps the number of items regardless of
/// their dates. Every bound is optional; the default is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSpec {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl WindowSpec {
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyWindow`] if both dates are set and `since`
    /// is not strictly before `until`.
    pub fn new(
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Self, CoreError> {
        if let (Some(s), Some(u)) = (since, until) {
            if s >= u {
                return Err(CoreError::EmptyWindow {
                    since: s.to_rfc3339(),
                    until: u.to_rfc3339(),
                });
            }
        }
        Ok(Self {
            since,
            until,
            limit,
        })
    }

    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn has_date_range(&self) -> bool {
        self.since.is_some() || self.until.is_some()
    }

    /// `true` when at least one bound makes the windowed sequence finite.
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.since.is_some() || self.limit.is_some()
    }

    /// Still newer than the window (should be skipped).
    #[must_use]
    pub fn is_after_until(&self, ts: DateTime<Utc>) -> bool {
        self.until.is_some_and(|u| ts >= u)
    }

    /// At or older than `since` (the sequence ends here).
    #[must_use]
    pub fn is_at_or_before_since(&self, ts: DateTime<Utc>) -> bool {
        self.since.is_some_and(|s| ts <= s)
    }

    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        !self.is_after_until(ts) && !self.is_at_or_before_since(ts)
    }
}

/// Parses a `YYYY-MM-DD` day into midnight UTC.
///
/// # Errors
///
/// Returns [`CoreError::InvalidDate`] for anything else.
pub fn parse_day(input: &str) -> Result<DateTime<Utc>, CoreError> {
    let invalid = || CoreError::InvalidDate {
        input: input.to_owned(),
    };
    let day = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    day.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn default_is_unbounded() {
        let w = WindowSpec::default();
        assert!(!w.is_bounded());
        assert!(!w.has_date_range());
        assert!(w.contains(ts(1999, 1, 1)));
    }

    #[test]
    fn since_must_precede_until() {
        let day = parse_day("2024-03-01").unwrap();
        let err = WindowSpec::new(Some(day), Some(day), None).unwrap_err();
        assert!(matches!(err, CoreError::EmptyWindow { .. }));
    }

    #[test]
    fn contains_excludes_until_and_since() {
        let since = parse_day("2024-01-01").unwrap();
        let until = parse_day("2024-02-01").unwrap();
        let w = WindowSpec::new(Some(since), Some(until), None).unwrap();
        assert!(w.contains(ts(2024, 1, 15)));
        assert!(!w.contains(until));
        assert!(!w.contains(since));
        assert!(!w.contains(ts(2024, 2, 2)));
    }

    #[test]
    fn limit_alone_is_bounded() {
        assert!(WindowSpec::with_limit(3).is_bounded());
    }

    #[test]
    fn until_alone_is_not_bounded() {
        let w = WindowSpec::new(None, Some(parse_day("2024-01-01").unwrap()), None).unwrap();
        assert!(!w.is_bounded());
    }

    #[test]
    fn parse_day_is_midnight_utc() {
        let day = parse_day("2023-07-04").unwrap();
        assert_eq!(day.to_rfc3339(), "2023-07-04T00:00:00+00:00");
    }

    #[test]
    fn parse_day_rejects_other_formats() {
        assert!(parse_day("04/07/2023").is_err());
        assert!(parse_day("2023-13-01").is_err());
    }
}
