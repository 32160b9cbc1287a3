//! Legend state: static toggles or a user-managed custom metric list
//!
//! Invariants:
//! - A static legend always keeps at least one visible entry
//! - A custom legend always keeps at least one metric
//! - Rejected operations leave the legend untouched

use crate::error::InteractionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which activity graph is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    #[default]
    Issues,
    Coverage,
    Duplications,
    Custom,
}

impl GraphType {
    /// Metrics charted by a static graph (empty for custom)
    pub fn static_metrics(self) -> &'static [&'static str] {
        match self {
            GraphType::Issues => &["bugs", "code_smells", "vulnerabilities"],
            GraphType::Coverage => &["lines_to_cover", "uncovered_lines"],
            GraphType::Duplications => &["ncloc", "duplicated_lines"],
            GraphType::Custom => &[],
        }
    }

    /// Extra measure shown in the tooltip next to the charted series
    pub fn supplementary_metric(self) -> Option<&'static str> {
        match self {
            GraphType::Coverage => Some("coverage"),
            GraphType::Duplications => Some("duplicated_lines_density"),
            GraphType::Issues | GraphType::Custom => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GraphType::Issues => "issues",
            GraphType::Coverage => "coverage",
            GraphType::Duplications => "duplications",
            GraphType::Custom => "custom",
        }
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GraphType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issues" => Ok(GraphType::Issues),
            "coverage" => Ok(GraphType::Coverage),
            "duplications" => Ok(GraphType::Duplications),
            "custom" => Ok(GraphType::Custom),
            other => Err(format!(
                "unknown graph '{}' (expected issues, coverage, duplications or custom)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LegendEntry {
    pub metric: String,
    pub hidden: bool,
}

/// Fixed metric set with independent visibility toggles
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaticLegend {
    entries: Vec<LegendEntry>,
}

impl StaticLegend {
    pub fn new<I, S>(metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<LegendEntry> = Vec::new();
        for metric in metrics {
            let metric = metric.into();
            if !entries.iter().any(|entry| entry.metric == metric) {
                entries.push(LegendEntry {
                    metric,
                    hidden: false,
                });
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[LegendEntry] {
        &self.entries
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.entries.iter().any(|entry| entry.metric == metric)
    }

    pub fn is_hidden(&self, metric: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.metric == metric && entry.hidden)
    }

    pub fn visible_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.hidden).count()
    }

    /// False when hiding `metric` would leave nothing visible
    pub fn can_toggle(&self, metric: &str) -> bool {
        match self.entries.iter().find(|entry| entry.metric == metric) {
            Some(entry) => entry.hidden || self.visible_count() > 1,
            None => false,
        }
    }

    /// Flip visibility of `metric`, returning its new `hidden` flag
    pub fn toggle(&mut self, metric: &str) -> Result<bool, InteractionError> {
        let visible = self.visible_count();
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.metric == metric)
            .ok_or_else(|| InteractionError::UnknownMetric(metric.to_string()))?;

        if !entry.hidden && visible <= 1 {
            return Err(InteractionError::LastVisibleSeries);
        }
        entry.hidden = !entry.hidden;
        Ok(entry.hidden)
    }
}

/// User-curated ordered metric list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomLegend {
    metrics: Vec<String>,
}

impl CustomLegend {
    /// Deduplicated list in first-seen order; an empty list is rejected
    pub fn new<I, S>(metrics: I) -> Result<Self, InteractionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for metric in metrics {
            let metric = metric.into();
            if !list.contains(&metric) {
                list.push(metric);
            }
        }
        if list.is_empty() {
            return Err(InteractionError::EmptyCustomLegend);
        }
        Ok(Self { metrics: list })
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.metrics.iter().any(|m| m == metric)
    }

    pub fn position(&self, metric: &str) -> Option<usize> {
        self.metrics.iter().position(|m| m == metric)
    }

    pub fn can_remove(&self) -> bool {
        self.metrics.len() > 1
    }

    /// Append `metric`; `max` is the caller's cap
    pub fn add(&mut self, metric: &str, max: usize) -> Result<(), InteractionError> {
        if self.contains(metric) {
            return Err(InteractionError::DuplicateMetric(metric.to_string()));
        }
        if self.metrics.len() >= max {
            return Err(InteractionError::CustomMetricLimit(max));
        }
        self.metrics.push(metric.to_string());
        Ok(())
    }

    pub fn remove(&mut self, metric: &str) -> Result<(), InteractionError> {
        let idx = self
            .position(metric)
            .ok_or_else(|| InteractionError::UnknownMetric(metric.to_string()))?;
        if !self.can_remove() {
            return Err(InteractionError::LastCustomMetric);
        }
        self.metrics.remove(idx);
        Ok(())
    }
}

/// Legend variant of a graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Legend {
    Static(StaticLegend),
    Custom(CustomLegend),
}

impl Legend {
    /// Static legend for the graph's declared metrics, or a custom list
    pub fn for_graph(graph: GraphType, custom_metrics: &[String]) -> Result<Self, InteractionError> {
        match graph {
            GraphType::Custom => Ok(Legend::Custom(CustomLegend::new(
                custom_metrics.iter().cloned(),
            )?)),
            other => Ok(Legend::Static(StaticLegend::new(
                other.static_metrics().iter().copied(),
            ))),
        }
    }

    /// Whether series for `metric` belong on the chart at all
    pub fn tracks(&self, metric: &str) -> bool {
        match self {
            Legend::Static(legend) => legend.contains(metric),
            Legend::Custom(legend) => legend.contains(metric),
        }
    }

    pub fn is_hidden(&self, metric: &str) -> bool {
        match self {
            Legend::Static(legend) => legend.is_hidden(metric),
            Legend::Custom(_) => false,
        }
    }

    pub fn toggle(&mut self, metric: &str) -> Result<bool, InteractionError> {
        match self {
            Legend::Static(legend) => legend.toggle(metric),
            Legend::Custom(_) => Err(InteractionError::WrongLegendMode),
        }
    }

    pub fn add(&mut self, metric: &str, max: usize) -> Result<(), InteractionError> {
        match self {
            Legend::Custom(legend) => legend.add(metric, max),
            Legend::Static(_) => Err(InteractionError::WrongLegendMode),
        }
    }

    pub fn remove(&mut self, metric: &str) -> Result<(), InteractionError> {
        match self {
            Legend::Custom(legend) => legend.remove(metric),
            Legend::Static(_) => Err(InteractionError::WrongLegendMode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_toggle_hides_and_shows() {
        let mut legend = StaticLegend::new(["bugs", "code_smells"]);
        assert_eq!(legend.toggle("bugs"), Ok(true));
        assert!(legend.is_hidden("bugs"));
        assert_eq!(legend.toggle("bugs"), Ok(false));
        assert_eq!(legend.visible_count(), 2);
    }

    #[test]
    fn test_static_rejects_hiding_last_visible() {
        let mut legend = StaticLegend::new(["bugs", "code_smells"]);
        legend.toggle("bugs").unwrap();
        assert!(!legend.can_toggle("code_smells"));
        assert_eq!(
            legend.toggle("code_smells"),
            Err(InteractionError::LastVisibleSeries)
        );
        assert_eq!(legend.visible_count(), 1, "rejected toggle must be a no-op");
        assert!(legend.can_toggle("bugs"), "showing a hidden entry is always allowed");
    }

    #[test]
    fn test_static_single_entry_never_hides() {
        let mut legend = StaticLegend::new(["ncloc"]);
        assert!(legend.toggle("ncloc").is_err());
        assert_eq!(legend.visible_count(), 1);
    }

    #[test]
    fn test_static_unknown_metric() {
        let mut legend = StaticLegend::new(["bugs"]);
        assert_eq!(
            legend.toggle("coverage"),
            Err(InteractionError::UnknownMetric("coverage".to_string()))
        );
    }

    #[test]
    fn test_custom_remove_keeps_one() {
        let mut legend = CustomLegend::new(["coverage", "ncloc"]).unwrap();
        legend.remove("coverage").unwrap();
        assert_eq!(legend.metrics(), &["ncloc".to_string()]);
        assert_eq!(legend.remove("ncloc"), Err(InteractionError::LastCustomMetric));
        assert_eq!(legend.metrics().len(), 1);
    }

    #[test]
    fn test_custom_add_respects_cap_and_duplicates() {
        let mut legend = CustomLegend::new(["coverage"]).unwrap();
        assert_eq!(
            legend.add("coverage", 4),
            Err(InteractionError::DuplicateMetric("coverage".to_string()))
        );
        legend.add("ncloc", 2).unwrap();
        assert_eq!(legend.add("bugs", 2), Err(InteractionError::CustomMetricLimit(2)));
        assert_eq!(legend.metrics(), &["coverage".to_string(), "ncloc".to_string()]);
    }

    #[test]
    fn test_custom_legend_needs_a_metric() {
        let empty: [&str; 0] = [];
        assert_eq!(CustomLegend::new(empty), Err(InteractionError::EmptyCustomLegend));
        assert_eq!(
            Legend::for_graph(GraphType::Custom, &[]),
            Err(InteractionError::EmptyCustomLegend)
        );
        let deduped = CustomLegend::new(["ncloc", "ncloc"]).unwrap();
        assert_eq!(deduped.metrics(), &["ncloc".to_string()]);
    }

    #[test]
    fn test_legend_mode_mismatch() {
        let mut legend = Legend::for_graph(GraphType::Issues, &[]).unwrap();
        assert_eq!(legend.remove("bugs"), Err(InteractionError::WrongLegendMode));
        let mut custom = Legend::for_graph(GraphType::Custom, &["coverage".to_string()]).unwrap();
        assert_eq!(custom.toggle("coverage"), Err(InteractionError::WrongLegendMode));
    }

    #[test]
    fn test_graph_type_round_trips_through_str() {
        for graph in [
            GraphType::Issues,
            GraphType::Coverage,
            GraphType::Duplications,
            GraphType::Custom,
        ] {
            assert_eq!(graph.as_str().parse::<GraphType>(), Ok(graph));
        }
        assert!("activity".parse::<GraphType>().is_err());
    }
}
