//! Tabular fallback for the activity graph
//!
//! Global invariants enforced:
//! - One row per distinct visible timestamp inside the domain, ascending
//! - Identical input yields identical rows (no hash iteration order)
//! - `to_table` never truncates; `DataTable::limited` does, and says so

use crate::domain::ClippedDomain;
use crate::events::EventIndex;
use crate::format::format_measure;
use crate::model::{Analysis, MetricType};
use crate::series::{visible_series, Serie};
use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Default strftime pattern for the date column
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Default number of rows shown before truncation
pub const DEFAULT_MAX_ROWS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TableColumn {
    pub metric: String,
    pub name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TableRow {
    #[serde(with = "crate::date::rfc3339")]
    pub date: DateTime<Utc>,
    pub formatted_date: String,
    /// One cell per column; `None` when the series has no point at `date`
    pub cells: Vec<Option<String>>,
    pub events: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DataTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
    pub total_rows: usize,
    pub truncated: bool,
}

impl DataTable {
    /// Keep the first `max_rows` rows, recording that the rest were cut
    pub fn limited(mut self, max_rows: usize) -> Self {
        if self.rows.len() > max_rows {
            self.rows.truncate(max_rows);
            self.truncated = true;
        }
        self
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize data table to JSON")
    }
}

/// True when `pattern` is a usable strftime pattern
pub fn is_valid_date_format(pattern: &str) -> bool {
    !pattern.trim().is_empty()
        && !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Projects series and analyses into rows
#[derive(Debug, Clone)]
pub struct TableExporter {
    date_format: String,
}

impl Default for TableExporter {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl TableExporter {
    /// Exporter with a strftime date pattern, rejected up front when unusable
    pub fn new(date_format: impl Into<String>) -> Result<Self> {
        let date_format = date_format.into();
        if !is_valid_date_format(&date_format) {
            anyhow::bail!("invalid table date format: {:?}", date_format);
        }
        Ok(Self { date_format })
    }

    pub fn to_table(
        &self,
        series: &[Serie],
        analyses: &[Analysis],
        domain: &ClippedDomain,
    ) -> DataTable {
        let visible: Vec<&Serie> = visible_series(series).collect();
        let events = EventIndex::new(analyses);

        let timestamps: BTreeSet<DateTime<Utc>> = visible
            .iter()
            .flat_map(|serie| serie.data.iter().map(|point| point.x))
            .filter(|date| domain.contains(*date))
            .collect();

        let rows: Vec<TableRow> = timestamps
            .into_iter()
            .map(|date| TableRow {
                date,
                formatted_date: date.format(&self.date_format).to_string(),
                cells: visible
                    .iter()
                    .map(|serie| {
                        serie
                            .value_at(date)
                            .map(|value| format_measure(value, serie.metric_type))
                    })
                    .collect(),
                events: events.event_names(date),
            })
            .collect();

        DataTable {
            columns: visible
                .iter()
                .map(|serie| TableColumn {
                    metric: serie.name.clone(),
                    name: serie.translated_name.clone(),
                    metric_type: serie.metric_type,
                })
                .collect(),
            total_rows: rows.len(),
            rows,
            truncated: false,
        }
    }
}

/// Render a table as aligned plain text
pub fn render_text(table: &DataTable) -> String {
    let mut header: Vec<String> = vec!["Date".to_string()];
    header.extend(table.columns.iter().map(|column| column.name.clone()));
    header.push("Events".to_string());

    let body: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            let mut line = vec![row.formatted_date.clone()];
            line.extend(row.cells.iter().map(|cell| cell.clone().unwrap_or_else(|| "-".to_string())));
            line.push(row.events.clone());
            line
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for line in &body {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    for line in std::iter::once(&header).chain(body.iter()) {
        let padded: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        output.push_str(padded.join("  ").trim_end());
        output.push('\n');
    }

    if table.truncated {
        output.push_str(&format!(
            "\nShowing {} of {} rows\n",
            table.rows.len(),
            table.total_rows
        ));
    }

    output
}
