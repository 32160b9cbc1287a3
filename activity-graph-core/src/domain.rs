//! Date domain: explicit zoom bounds and the effective chart window
//!
//! Global invariants enforced:
//! - An explicit bound is never moved to fit the data
//! - Hidden series never contribute to the derived extent
//! - A derived window is never inverted and never NaN-like

use crate::series::{visible_series, Serie};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Optional zoom bounds; `None` means "use the data extent on that side"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DateDomain {
    #[serde(
        default,
        with = "crate::date::rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub start: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "crate::date::rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<DateTime<Utc>>,
}

impl DateDomain {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Span between both bounds, when both are set
    pub fn span(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Effective window handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClippedDomain {
    #[serde(with = "crate::date::rfc3339")]
    pub start: DateTime<Utc>,
    #[serde(with = "crate::date::rfc3339")]
    pub end: DateTime<Utc>,
}

impl ClippedDomain {
    /// Inclusive on both ends
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Min/max `x` across visible series, `None` if none has data
pub fn data_extent(series: &[Serie]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    visible_series(series).fold(None, |extent, serie| {
        match (serie.first_date(), serie.last_date(), extent) {
            (Some(first), Some(last), Some((min, max))) => Some((min.min(first), max.max(last))),
            (Some(first), Some(last), None) => Some((first, last)),
            _ => extent,
        }
    })
}

/// Effective window at the current wall-clock time
pub fn clip(series: &[Serie], domain: &DateDomain) -> ClippedDomain {
    clip_at(series, domain, Utc::now())
}

/// Effective window; `now` anchors the fallback when there is no data
pub fn clip_at(series: &[Serie], domain: &DateDomain, now: DateTime<Utc>) -> ClippedDomain {
    if let (Some(start), Some(end)) = (domain.start, domain.end) {
        return ClippedDomain { start, end };
    }

    let one_day = Duration::days(1);
    let (start, end) = match (data_extent(series), domain.start, domain.end) {
        (Some((_, max)), Some(start), None) => {
            // explicit start past the data: push the derived end a day out
            let end = if max < start { shift(start, one_day) } else { max };
            (start, end)
        }
        (Some((min, _)), None, Some(end)) => {
            let start = if min > end { shift(end, -one_day) } else { min };
            (start, end)
        }
        (Some((min, max)), None, None) => (min, max),
        (None, Some(start), None) => {
            let end = if now > start { now } else { shift(start, one_day) };
            (start, end)
        }
        (None, None, Some(end)) => (shift(end, -one_day), end),
        (None, None, None) => (shift(now, -one_day), now),
        // both bounds set returned above
        (_, Some(start), Some(end)) => (start, end),
    };

    ClippedDomain { start, end }
}

fn shift(date: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    date.checked_add_signed(by).unwrap_or(date)
}
