// Time Range Value Object
// All instants are epoch milliseconds (UTC)

use serde::{Deserialize, Serialize};

pub const MINUTE_MS: i64 = 60 * 1000;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// 0001-01-01T00:00:00Z
pub const MIN_INSTANT: i64 = -62_135_596_800_000;
/// 9999-12-31T23:59:59.999Z
pub const MAX_INSTANT: i64 = 253_402_300_799_999;

/// Half-open time range `[start, end)` in epoch ms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    /// Build a range, rejecting empty or inverted bounds and instants
    /// outside years 1..=9999
    pub fn new(start: i64, end: i64) -> crate::domain::error::Result<Self> {
        let supported = MIN_INSTANT..=MAX_INSTANT;
        if !supported.contains(&start) || !supported.contains(&end) {
            return Err(crate::domain::error::DomainError::ValidationError(format!(
                "Invalid time range: [{}, {}) is outside the supported calendar",
                start, end
            )));
        }
        if start >= end {
            return Err(crate::domain::error::DomainError::ValidationError(format!(
                "Invalid time range: start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Build a range without validation (caller guarantees `start < end`)
    pub const fn from_bounds(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains_instant(&self, t: i64) -> bool {
        self.start <= t && t < self.end
    }

    /// True if `other` lies entirely within `self`
    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Grow the range by `before` ms at the start and `after` ms at the end,
    /// saturating at the i64 bounds
    pub fn pad(&self, before: i64, after: i64) -> TimeRange {
        TimeRange {
            start: self.start.saturating_sub(before),
            end: self.end.saturating_add(after),
        }
    }

    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeRange { start, end })
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_range() {
        assert!(TimeRange::new(10, 10).is_err());
        assert!(TimeRange::new(20, 10).is_err());
        assert!(TimeRange::new(10, 11).is_ok());
    }

    #[test]
    fn test_new_rejects_instants_outside_calendar() {
        assert!(TimeRange::new(1_704_067_200_000, i64::MAX).is_err());
        assert!(TimeRange::new(i64::MIN, 0).is_err());
        assert!(TimeRange::new(MAX_INSTANT, MAX_INSTANT + 1).is_err());
        assert!(TimeRange::new(MIN_INSTANT, MAX_INSTANT).is_ok());
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = TimeRange::from_bounds(0, 10);
        let b = TimeRange::from_bounds(10, 20);
        assert!(!a.overlaps(&b), "Adjacent ranges do not overlap");
        assert!(a.overlaps(&TimeRange::from_bounds(9, 20)));
        assert_eq!(a.intersection(&b), None);
        assert_eq!(
            a.intersection(&TimeRange::from_bounds(5, 20)),
            Some(TimeRange::from_bounds(5, 10))
        );
    }

    #[test]
    fn test_pad() {
        let r = TimeRange::from_bounds(100, 200).pad(10, 20);
        assert_eq!(r, TimeRange::from_bounds(90, 220));
        assert!(r.contains(&TimeRange::from_bounds(100, 200)));
    }

    #[test]
    fn test_pad_saturates_at_extremes() {
        let r = TimeRange::from_bounds(i64::MIN + 1, i64::MAX - 1).pad(600_000, 600_000);
        assert_eq!(r, TimeRange::from_bounds(i64::MIN, i64::MAX));
        assert!(!r.is_empty());
        assert_eq!(r.duration_ms(), i64::MAX);
    }
}
