//! Analysis events by date
//!
//! Lookups are by exact timestamp equality: tooltip and table dates always
//! come from series data, which is itself built from analysis timestamps.

use crate::model::{Analysis, AnalysisEvent};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Events of the analysis whose date equals `date`, or an empty slice
///
/// When several analyses share a timestamp the first one in input order wins.
pub fn events_for_date(analyses: &[Analysis], date: DateTime<Utc>) -> &[AnalysisEvent] {
    analyses
        .iter()
        .find(|analysis| analysis.date == date)
        .map(|analysis| analysis.events.as_slice())
        .unwrap_or(&[])
}

/// Pre-sorted index over a borrowed analysis list
#[derive(Debug, Clone)]
pub struct EventIndex<'a> {
    by_date: BTreeMap<DateTime<Utc>, &'a Analysis>,
}

impl<'a> EventIndex<'a> {
    pub fn new(analyses: &'a [Analysis]) -> Self {
        let mut by_date = BTreeMap::new();
        for analysis in analyses {
            // first in input order wins, same as events_for_date
            by_date.entry(analysis.date).or_insert(analysis);
        }
        Self { by_date }
    }

    pub fn events_for_date(&self, date: DateTime<Utc>) -> &'a [AnalysisEvent] {
        self.by_date
            .get(&date)
            .map(|analysis| analysis.events.as_slice())
            .unwrap_or(&[])
    }

    /// Event names at `date` joined for a single table cell
    pub fn event_names(&self, date: DateTime<Utc>) -> String {
        self.events_for_date(date)
            .iter()
            .map(|event| event.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
