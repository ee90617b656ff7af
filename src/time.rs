//! Temporal interval algebra.
//!
//! Every norm is in force over a half-open span of calendar days
//! `[start, end)`. An absent end means the norm is still in force.
//! Two spans that merely touch (`a.end == b.start`) do not overlap.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A half-open span of days: `[start, end)`.
///
/// A zero-length interval (`start == end`) can be constructed but is
/// degenerate: it contains no day and overlaps nothing, not even itself.
/// Norm construction rejects it.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use lexaudit::TemporalInterval;
///
/// let d = |y, m, dd| NaiveDate::from_ymd_opt(y, m, dd).unwrap();
/// let a = TemporalInterval::new(d(2023, 1, 1), Some(d(2023, 7, 5))).unwrap();
/// let b = TemporalInterval::unbounded(d(2023, 6, 1));
///
/// let overlap = a.intersection(&b).unwrap();
/// assert_eq!(overlap.start(), d(2023, 6, 1));
/// assert_eq!(overlap.end(), Some(d(2023, 7, 5)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TemporalInterval {
    /// First day in force (inclusive).
    start: NaiveDate,

    /// First day no longer in force (exclusive). None means unbounded.
    end: Option<NaiveDate>,
}

impl TemporalInterval {
    /// Creates an interval.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvertedInterval` if `end < start`.
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self, ValidationError> {
        if let Some(end) = end {
            if end < start {
                return Err(ValidationError::InvertedInterval { start, end });
            }
        }
        Ok(Self { start, end })
    }

    /// Creates a bounded interval `[start, end)`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvertedInterval` if `end < start`.
    pub fn bounded(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        Self::new(start, Some(end))
    }

    /// Creates an interval that is still in force.
    #[must_use]
    pub const fn unbounded(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    /// First day included.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day excluded; `None` when open-ended.
    #[must_use]
    pub const fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// True when the interval has no end.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.end.is_none()
    }

    /// True when `start == end`.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.end == Some(self.start)
    }

    /// Length in days. `None` means infinite.
    #[must_use]
    pub fn duration_days(&self) -> Option<i64> {
        self.end.map(|end| (end - self.start).num_days())
    }

    /// Check if a day falls within `[start, end)`.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.map_or(true, |end| date < end)
    }

    /// True iff the two intervals share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let start = self.start.max(other.start);
        match earliest_end(self.end, other.end) {
            Some(end) => start < end,
            None => true,
        }
    }

    /// Returns the shared days of two intervals, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self {
            start: self.start.max(other.start),
            end: earliest_end(self.end, other.end),
        })
    }

    /// Joins two intervals that overlap or touch.
    ///
    /// Returns `None` when a gap separates them. A degenerate operand is
    /// empty, so the union is the other operand.
    #[must_use]
    pub fn union(&self, other: &Self) -> Option<Self> {
        if self.is_degenerate() {
            return Some(*other);
        }
        if other.is_degenerate() {
            return Some(*self);
        }
        let touching = self.end == Some(other.start) || other.end == Some(self.start);
        if !touching && !self.overlaps(other) {
            return None;
        }
        Some(Self {
            start: self.start.min(other.start),
            end: latest_end(self.end, other.end),
        })
    }

    /// Smallest interval covering every input, gaps included.
    #[must_use]
    pub fn hull<'a, I>(intervals: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        intervals.into_iter().fold(None, |acc: Option<Self>, next| {
            Some(match acc {
                None => *next,
                Some(acc) => Self {
                    start: acc.start.min(next.start),
                    end: latest_end(acc.end, next.end),
                },
            })
        })
    }

    /// Splits the interval at `date` into the parts before and from it.
    #[must_use]
    pub fn split_at(&self, date: NaiveDate) -> (Option<Self>, Option<Self>) {
        if date <= self.start {
            return (None, Some(*self));
        }
        if let Some(end) = self.end {
            if date >= end {
                return (Some(*self), None);
            }
        }
        (
            Some(Self {
                start: self.start,
                end: Some(date),
            }),
            Some(Self {
                start: date,
                end: self.end,
            }),
        )
    }

    /// True when this interval is strictly shorter than `other`.
    #[must_use]
    pub fn is_narrower_than(&self, other: &Self) -> bool {
        match (self.duration_days(), other.duration_days()) {
            (Some(mine), Some(theirs)) => mine < theirs,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

/// `min` over ends where `None` is +infinity.
fn earliest_end(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// `max` over ends where `None` is +infinity.
fn latest_end(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for TemporalInterval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            start: NaiveDate,
            #[serde(default)]
            end: Option<NaiveDate>,
        }

        let raw = Raw::deserialize(deserializer)?;
        TemporalInterval::new(raw.start, raw.end).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for TemporalInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, ∞)", self.start),
        }
    }
}
