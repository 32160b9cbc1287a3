//! Activity document: analyses, measure histories and the metric catalogue
//!
//! These are the read-only snapshots delivered by the data-fetch layer. The
//! core never mutates them; derived shapes are rebuilt from them instead.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Annotation attached to an analysis (version tag, quality gate change, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisEvent {
    pub key: String,
    pub category: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One historical scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Analysis {
    pub key: String,
    #[serde(with = "crate::date::rfc3339")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub events: Vec<AnalysisEvent>,
}

/// Raw history point; `value` is string-encoded and may be absent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HistoryPoint {
    #[serde(with = "crate::date::rfc3339")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Full time series of one metric
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MeasureHistory {
    pub metric: String,
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
    /// Boundary between "new code" and "overall code"
    #[serde(
        default,
        with = "crate::date::rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub split_point_date: Option<DateTime<Utc>>,
}

impl MeasureHistory {
    /// Raw value recorded at exactly `date`, if any
    pub fn raw_value_at(&self, date: DateTime<Utc>) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|point| point.date == date)
            .and_then(|point| point.value.as_deref())
    }
}

/// Declared metric value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    #[default]
    Int,
    Float,
    Percent,
    Millisec,
    WorkDur,
    Rating,
    Level,
}

impl MetricType {
    /// Rating and level values are letter/status codes, never numbers
    pub fn keeps_raw_code(self) -> bool {
        matches!(self, MetricType::Rating | MetricType::Level)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Int => "INT",
            MetricType::Float => "FLOAT",
            MetricType::Percent => "PERCENT",
            MetricType::Millisec => "MILLISEC",
            MetricType::WorkDur => "WORK_DUR",
            MetricType::Rating => "RATING",
            MetricType::Level => "LEVEL",
        }
    }
}

/// Catalogue entry describing a metric
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Metric {
    pub key: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub metric_type: MetricType,
}

/// Find a catalogue entry by key
pub fn find_metric<'a>(metrics: &'a [Metric], key: &str) -> Option<&'a Metric> {
    metrics.iter().find(|metric| metric.key == key)
}

/// Everything one page view of the activity graph consumes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActivityData {
    #[serde(default)]
    pub analyses: Vec<Analysis>,
    #[serde(default)]
    pub measures: Vec<MeasureHistory>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(
        default,
        with = "crate::date::rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub leak_period_date: Option<DateTime<Utc>>,
}

impl ActivityData {
    /// Parse an activity document from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse activity document")
    }

    /// Load an activity document from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read activity document: {}", path.display()))?;
        let data = Self::from_json(&content)
            .with_context(|| format!("invalid activity document: {}", path.display()))?;
        tracing::debug!(
            analyses = data.analyses.len(),
            measures = data.measures.len(),
            "loaded activity document from {}",
            path.display()
        );
        Ok(data)
    }
}
