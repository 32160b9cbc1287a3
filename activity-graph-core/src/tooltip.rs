//! Tooltip coordination: nearest-point snapping and the hover/pin state machine
//!
//! States:
//! - Idle: nothing selected
//! - Hovering: follows the pointer, cleared when the pointer leaves
//! - Pinned: set by a click or keyboard step, survives pointer moves and
//!   pointer leave, cleared only by a deselect or an external reset
//!
//! Values are never interpolated: a series without a point at the selected
//! date contributes an explicit no-data cell.

use crate::events::EventIndex;
use crate::format::format_measure;
use crate::model::{AnalysisEvent, MetricType};
use crate::series::{visible_series, Serie, YValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which timestamp wins when two are equally close to the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    #[default]
    Earlier,
    Later,
}

impl TieBreak {
    pub fn as_str(self) -> &'static str {
        match self {
            TieBreak::Earlier => "earlier",
            TieBreak::Later => "later",
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Selection {
    #[serde(with = "crate::date::rfc3339")]
    pub selected_date: DateTime<Utc>,
    /// Position of `selected_date` in the reference series, if present there
    pub index: Option<usize>,
    /// Pixel offset reported by the renderer; `None` for keyboard selection
    pub x_position: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TooltipState {
    #[default]
    Idle,
    Hovering(Selection),
    Pinned(Selection),
}

impl TooltipState {
    pub fn selection(&self) -> Option<&Selection> {
        match self {
            TooltipState::Idle => None,
            TooltipState::Hovering(selection) | TooltipState::Pinned(selection) => Some(selection),
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, TooltipState::Pinned(_))
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TooltipState::Idle)
    }
}

/// Keyboard navigation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Previous,
    Next,
}

/// Sorted, deduplicated timestamps across visible series
pub fn visible_timestamps(series: &[Serie]) -> Vec<DateTime<Utc>> {
    visible_series(series)
        .flat_map(|serie| serie.data.iter().map(|point| point.x))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Closest data timestamp to `at` across all visible series
pub fn snap_to_nearest(
    series: &[Serie],
    at: DateTime<Utc>,
    tie_break: TieBreak,
) -> Option<DateTime<Utc>> {
    let mut best: Option<(chrono::Duration, DateTime<Utc>)> = None;

    for serie in visible_series(series) {
        let data = &serie.data;
        let idx = data.partition_point(|point| point.x < at);
        let before = idx.checked_sub(1).map(|i| data[i].x);
        let after = data.get(idx).map(|point| point.x);

        for candidate in [before, after].into_iter().flatten() {
            let distance = if candidate >= at {
                candidate - at
            } else {
                at - candidate
            };
            let better = match best {
                None => true,
                Some((best_distance, best_date)) => {
                    distance < best_distance
                        || (distance == best_distance
                            && match tie_break {
                                TieBreak::Earlier => candidate < best_date,
                                TieBreak::Later => candidate > best_date,
                            })
                }
            };
            if better {
                best = Some((distance, candidate));
            }
        }
    }

    best.map(|(_, date)| date)
}

/// Position of `date` in the first non-empty visible series
pub fn reference_index(series: &[Serie], date: DateTime<Utc>) -> Option<usize> {
    visible_series(series)
        .find(|serie| !serie.data.is_empty())
        .and_then(|serie| serie.position_of(date))
}

/// One metric's contribution to the tooltip
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TooltipCell {
    Value { value: YValue, formatted: String },
    NoData,
}

impl TooltipCell {
    pub fn from_value(value: Option<&YValue>, metric_type: MetricType) -> Self {
        match value {
            Some(value) => TooltipCell::Value {
                value: value.clone(),
                formatted: format_measure(value, metric_type),
            },
            None => TooltipCell::NoData,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TooltipLine {
    pub metric: String,
    pub translated_name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub cell: TooltipCell,
}

impl TooltipLine {
    pub fn for_serie(serie: &Serie, date: DateTime<Utc>) -> Self {
        Self {
            metric: serie.name.clone(),
            translated_name: serie.translated_name.clone(),
            metric_type: serie.metric_type,
            cell: TooltipCell::from_value(serie.value_at(date), serie.metric_type),
        }
    }
}

/// Everything the tooltip UI renders for one selection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TooltipPayload {
    #[serde(with = "crate::date::rfc3339")]
    pub selected_date: DateTime<Utc>,
    pub index: Option<usize>,
    pub x_position: Option<f64>,
    pub pinned: bool,
    pub values: Vec<TooltipLine>,
    pub events: Vec<AnalysisEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplementary: Option<TooltipLine>,
}

#[derive(Debug, Clone, Default)]
pub struct TooltipCoordinator {
    state: TooltipState,
    tie_break: TieBreak,
}

impl TooltipCoordinator {
    pub fn new(tie_break: TieBreak) -> Self {
        Self {
            state: TooltipState::Idle,
            tie_break,
        }
    }

    pub fn state(&self) -> &TooltipState {
        &self.state
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Pointer moved inside the chart; ignored while pinned
    pub fn pointer_move(&mut self, series: &[Serie], at: DateTime<Utc>, x_position: f64) {
        if self.state.is_pinned() {
            return;
        }
        self.state = match self.resolve(series, at, Some(x_position)) {
            Some(selection) => TooltipState::Hovering(selection),
            None => TooltipState::Idle,
        };
    }

    /// Click or tap inside the chart pins the snapped point
    pub fn click(&mut self, series: &[Serie], at: DateTime<Utc>, x_position: f64) {
        self.state = match self.resolve(series, at, Some(x_position)) {
            Some(selection) => TooltipState::Pinned(selection),
            None => TooltipState::Idle,
        };
    }

    /// Move to the neighbouring timestamp and pin it
    pub fn step(&mut self, series: &[Serie], step: Step) {
        let timestamps = visible_timestamps(series);
        let target = match (self.state.selection(), step) {
            (None, Step::Next) => timestamps.first().copied(),
            (None, Step::Previous) => timestamps.last().copied(),
            (Some(current), Step::Next) => {
                let idx = timestamps.partition_point(|date| *date <= current.selected_date);
                timestamps
                    .get(idx)
                    .or_else(|| timestamps.last())
                    .copied()
            }
            (Some(current), Step::Previous) => {
                let idx = timestamps.partition_point(|date| *date < current.selected_date);
                idx.checked_sub(1)
                    .and_then(|i| timestamps.get(i))
                    .or_else(|| timestamps.first())
                    .copied()
            }
        };

        self.state = match target {
            Some(selected_date) => TooltipState::Pinned(Selection {
                selected_date,
                index: reference_index(series, selected_date),
                x_position: None,
            }),
            None => TooltipState::Idle,
        };
    }

    /// Pointer left the chart area; a pin survives
    pub fn pointer_leave(&mut self) {
        if let TooltipState::Hovering(_) = self.state {
            self.state = TooltipState::Idle;
        }
    }

    /// Explicit deselect (click elsewhere, escape)
    pub fn deselect(&mut self) {
        self.state = TooltipState::Idle;
    }

    /// Inputs under the selection changed (legend, zoom, data)
    pub fn reset(&mut self) {
        if !self.state.is_idle() {
            tracing::debug!(pinned = self.state.is_pinned(), "tooltip reset");
        }
        self.state = TooltipState::Idle;
    }

    fn resolve(
        &self,
        series: &[Serie],
        at: DateTime<Utc>,
        x_position: Option<f64>,
    ) -> Option<Selection> {
        let selected_date = snap_to_nearest(series, at, self.tie_break)?;
        Some(Selection {
            selected_date,
            index: reference_index(series, selected_date),
            x_position,
        })
    }

    /// Compose the payload for the current selection
    pub fn payload(
        &self,
        series: &[Serie],
        events: &EventIndex<'_>,
        supplementary: Option<TooltipLine>,
    ) -> Option<TooltipPayload> {
        let selection = self.state.selection()?;
        let date = selection.selected_date;
        Some(TooltipPayload {
            selected_date: date,
            index: selection.index,
            x_position: selection.x_position,
            pinned: self.state.is_pinned(),
            values: visible_series(series)
                .map(|serie| TooltipLine::for_serie(serie, date))
                .collect(),
            events: events.events_for_date(date).to_vec(),
            supplementary,
        })
    }
}
