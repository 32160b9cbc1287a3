//! Series construction from measure histories
//!
//! Global invariants enforced:
//! - `data` is strictly ascending in `x` (duplicates collapsed, last write wins)
//! - Absent or unparseable values are dropped, never charted as zero
//! - Series are rebuilt, never mutated in place

use crate::legend::Legend;
use crate::model::{find_metric, MeasureHistory, Metric, MetricType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Charted value: a number, or a raw rating/level code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YValue {
    Number(f64),
    Code(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriePoint {
    #[serde(with = "crate::date::rfc3339")]
    pub x: DateTime<Utc>,
    pub y: YValue,
}

/// Render-ready projection of one measure history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Serie {
    pub name: String,
    pub translated_name: String,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub hidden: bool,
    pub data: Vec<SeriePoint>,
}

impl Serie {
    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    /// Value recorded at exactly `date`
    pub fn value_at(&self, date: DateTime<Utc>) -> Option<&YValue> {
        self.position_of(date).map(|idx| &self.data[idx].y)
    }

    /// Index of `date` in `data`
    pub fn position_of(&self, date: DateTime<Utc>) -> Option<usize> {
        self.data.binary_search_by_key(&date, |point| point.x).ok()
    }

    pub fn first_date(&self) -> Option<DateTime<Utc>> {
        self.data.first().map(|point| point.x)
    }

    pub fn last_date(&self) -> Option<DateTime<Utc>> {
        self.data.last().map(|point| point.x)
    }
}

/// Visible series only, in declared order
pub fn visible_series(series: &[Serie]) -> impl Iterator<Item = &Serie> {
    series.iter().filter(|serie| serie.is_visible())
}

/// Coerce a raw history value according to the metric type
pub fn coerce_value(raw: Option<&str>, metric_type: MetricType) -> Option<YValue> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if metric_type.keeps_raw_code() {
        return Some(YValue::Code(raw.to_string()));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(YValue::Number)
}

/// Build one serie; `metric` is the catalogue entry when known
pub fn build_serie(history: &MeasureHistory, metric: Option<&Metric>, hidden: bool) -> Serie {
    let metric_type = metric.map(|m| m.metric_type).unwrap_or_default();

    let mut points: Vec<SeriePoint> = history
        .history
        .iter()
        .filter_map(|point| match coerce_value(point.value.as_deref(), metric_type) {
            Some(y) => Some(SeriePoint { x: point.date, y }),
            None => {
                if point.value.is_some() {
                    tracing::debug!(
                        metric = %history.metric,
                        "dropping unparseable value {:?}",
                        point.value
                    );
                }
                None
            }
        })
        .collect();

    // Stable sort keeps source order among equal timestamps
    points.sort_by_key(|point| point.x);

    let mut data: Vec<SeriePoint> = Vec::with_capacity(points.len());
    for point in points {
        match data.last_mut() {
            Some(last) if last.x == point.x => *last = point,
            _ => data.push(point),
        }
    }

    Serie {
        name: history.metric.clone(),
        translated_name: metric
            .map(|m| m.name.clone())
            .unwrap_or_else(|| history.metric.clone()),
        metric_type,
        hidden,
        data,
    }
}

/// Turns measure histories into series for the current legend
#[derive(Debug, Clone, Copy)]
pub struct SeriesBuilder<'a> {
    metrics: &'a [Metric],
}

impl<'a> SeriesBuilder<'a> {
    pub fn new(metrics: &'a [Metric]) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &'a [Metric] {
        self.metrics
    }

    /// Build series for every history the legend tracks
    ///
    /// Static legends keep the input order of `histories`; custom legends
    /// order by their own list. The first history per metric key wins.
    pub fn build(&self, histories: &[MeasureHistory], legend: &Legend) -> Vec<Serie> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut series: Vec<Serie> = histories
            .iter()
            .filter(|history| legend.tracks(&history.metric))
            .filter(|history| seen.insert(history.metric.as_str()))
            .map(|history| {
                build_serie(
                    history,
                    find_metric(self.metrics, &history.metric),
                    legend.is_hidden(&history.metric),
                )
            })
            .collect();

        if let Legend::Custom(custom) = legend {
            series.sort_by_key(|serie| custom.position(&serie.name).unwrap_or(usize::MAX));
        }

        series
    }
}

/// Last built series, keyed by a content fingerprint of their inputs
#[derive(Debug, Clone, Default)]
pub struct SeriesCache {
    fingerprint: Option<u64>,
    series: Vec<Serie>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return cached series, rebuilding only when the inputs changed
    pub fn get_or_build(
        &mut self,
        builder: &SeriesBuilder<'_>,
        histories: &[MeasureHistory],
        legend: &Legend,
    ) -> &[Serie] {
        let fingerprint = fingerprint(builder.metrics(), histories, legend);
        if self.fingerprint == Some(fingerprint) {
            tracing::debug!("series cache hit");
        } else {
            self.series = builder.build(histories, legend);
            self.fingerprint = Some(fingerprint);
            tracing::debug!(series = self.series.len(), "rebuilt series");
        }
        &self.series
    }

    pub fn series(&self) -> &[Serie] {
        &self.series
    }

    pub fn invalidate(&mut self) {
        self.fingerprint = None;
    }
}

fn fingerprint(metrics: &[Metric], histories: &[MeasureHistory], legend: &Legend) -> u64 {
    let mut hasher = DefaultHasher::new();
    metrics.hash(&mut hasher);
    histories.hash(&mut hasher);
    legend.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::{CustomLegend, StaticLegend};
    use crate::model::HistoryPoint;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn history(metric: &str, points: &[(u32, Option<&str>)]) -> MeasureHistory {
        MeasureHistory {
            metric: metric.to_string(),
            history: points
                .iter()
                .map(|(d, v)| HistoryPoint {
                    date: day(*d),
                    value: v.map(|v| v.to_string()),
                })
                .collect(),
            split_point_date: None,
        }
    }

    fn metric(key: &str, metric_type: MetricType) -> Metric {
        Metric {
            key: key.to_string(),
            name: key.replace('_', " "),
            metric_type,
        }
    }

    #[test]
    fn test_absent_and_malformed_values_are_dropped() {
        let h = history("bugs", &[(1, Some("3")), (2, None), (3, Some("n/a")), (4, Some(""))]);
        let serie = build_serie(&h, None, false);
        assert_eq!(serie.data.len(), 1);
        assert_eq!(serie.data[0].y, YValue::Number(3.0));
    }

    #[test]
    fn test_unsorted_duplicates_collapse_last_write_wins() {
        let h = history(
            "bugs",
            &[(3, Some("30")), (1, Some("10")), (3, Some("31")), (2, Some("20"))],
        );
        let serie = build_serie(&h, None, false);
        let xs: Vec<_> = serie.data.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![day(1), day(2), day(3)]);
        assert_eq!(serie.value_at(day(3)), Some(&YValue::Number(31.0)));
    }

    #[test]
    fn test_rating_keeps_raw_code() {
        let h = history("reliability_rating", &[(1, Some("1.0")), (2, Some("3.0"))]);
        let m = metric("reliability_rating", MetricType::Rating);
        let serie = build_serie(&h, Some(&m), false);
        assert_eq!(serie.data[1].y, YValue::Code("3.0".to_string()));
        assert_eq!(serie.translated_name, "reliability rating");
    }

    #[test]
    fn test_unknown_metric_defaults_to_int_and_key_name() {
        let serie = build_serie(&history("mystery", &[(1, Some("2"))]), None, false);
        assert_eq!(serie.metric_type, MetricType::Int);
        assert_eq!(serie.translated_name, "mystery");
    }

    #[test]
    fn test_empty_history_yields_empty_serie() {
        let serie = build_serie(&history("bugs", &[(1, None)]), None, false);
        assert!(serie.data.is_empty());
        assert!(serie.first_date().is_none());
    }

    #[test]
    fn test_static_build_keeps_input_order_and_hidden_flags() {
        let histories = vec![
            history("code_smells", &[(1, Some("5"))]),
            history("coverage", &[(1, Some("80"))]),
            history("bugs", &[(1, Some("1"))]),
        ];
        let mut legend = StaticLegend::new(["bugs", "code_smells"]);
        legend.toggle("code_smells").unwrap();
        let series = SeriesBuilder::new(&[]).build(&histories, &Legend::Static(legend));
        let names: Vec<_> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["code_smells", "bugs"]);
        assert!(series[0].hidden);
        assert!(!series[1].hidden);
    }

    #[test]
    fn test_custom_build_follows_list_order_and_evicts_removed() {
        let histories = vec![
            history("ncloc", &[(1, Some("100"))]),
            history("coverage", &[(1, Some("80"))]),
            history("bugs", &[(1, Some("2"))]),
        ];
        let mut custom = CustomLegend::new(["coverage", "ncloc", "bugs"]).unwrap();
        let builder = SeriesBuilder::new(&[]);
        let series = builder.build(&histories, &Legend::Custom(custom.clone()));
        let names: Vec<_> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["coverage", "ncloc", "bugs"]);

        custom.remove("ncloc").unwrap();
        let series = builder.build(&histories, &Legend::Custom(custom));
        assert!(series.iter().all(|s| s.name != "ncloc"));
    }

    #[test]
    fn test_cache_rebuilds_only_on_change() {
        let histories = vec![history("bugs", &[(1, Some("1"))]), history("code_smells", &[(1, Some("4"))])];
        let builder = SeriesBuilder::new(&[]);
        let mut legend = Legend::for_graph(crate::legend::GraphType::Issues, &[]).unwrap();
        let mut cache = SeriesCache::new();

        let first = cache.get_or_build(&builder, &histories, &legend).to_vec();
        let again = cache.get_or_build(&builder, &histories, &legend).to_vec();
        assert_eq!(first, again);

        legend.toggle("bugs").unwrap();
        let toggled = cache.get_or_build(&builder, &histories, &legend);
        assert!(toggled.iter().any(|s| s.name == "bugs" && s.hidden));
    }
}
