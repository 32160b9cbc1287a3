//! Activity graph orchestrator
//!
//! Owns the legend, zoom and tooltip state of one chart instance and is the
//! only component that talks to the rendering primitive. Every accepted
//! interaction that changes the series set or the domain resets the tooltip.

use crate::config::ResolvedConfig;
use crate::domain::{clip, clip_at, ClippedDomain, DateDomain};
use crate::error::InteractionError;
use crate::events::EventIndex;
use crate::format::TickFormatter;
use crate::legend::{GraphType, Legend};
use crate::listeners::{ListenerGuard, ListenerKind, ListenerRegistry};
use crate::model::{find_metric, ActivityData, Analysis, MeasureHistory, Metric, MetricType};
use crate::series::{coerce_value, visible_series, Serie, SeriesBuilder, SeriesCache};
use crate::table::{DataTable, TableExporter};
use crate::tooltip::{
    Step, TieBreak, TooltipCell, TooltipCoordinator, TooltipLine, TooltipPayload, TooltipState,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Interaction limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphOptions {
    pub tie_break: TieBreak,
    pub min_zoom_hours: f64,
    pub max_custom_metrics: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::Earlier,
            min_zoom_hours: crate::config::DEFAULT_MIN_ZOOM_HOURS,
            max_custom_metrics: crate::config::DEFAULT_MAX_CUSTOM_METRICS,
        }
    }
}

impl From<&ResolvedConfig> for GraphOptions {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            tie_break: config.tie_break,
            min_zoom_hours: config.min_zoom_hours,
            max_custom_metrics: config.max_custom_metrics,
        }
    }
}

/// What the rendering primitive receives
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RenderModel {
    pub graph: GraphType,
    pub domain: ClippedDomain,
    /// Visible series only
    pub series: Vec<Serie>,
    pub metric_type: MetricType,
    #[serde(
        with = "crate::date::rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub split_point_date: Option<DateTime<Utc>>,
    #[serde(
        with = "crate::date::rfc3339_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub leak_period_date: Option<DateTime<Utc>>,
}

impl RenderModel {
    pub fn tick_formatter(&self) -> TickFormatter {
        TickFormatter::new(self.metric_type)
    }
}

#[derive(Debug)]
pub struct GraphHistory {
    graph: GraphType,
    analyses: Vec<Analysis>,
    histories: Vec<MeasureHistory>,
    metrics: Vec<Metric>,
    leak_period_date: Option<DateTime<Utc>>,
    legend: Legend,
    domain: DateDomain,
    tooltip: TooltipCoordinator,
    cache: SeriesCache,
    options: GraphOptions,
    listeners: ListenerRegistry,
    outside_click: Option<ListenerGuard>,
}

impl GraphHistory {
    pub fn new(data: ActivityData, graph: GraphType, legend: Legend, options: GraphOptions) -> Self {
        let mut history = Self {
            graph,
            analyses: data.analyses,
            histories: data.measures,
            metrics: data.metrics,
            leak_period_date: data.leak_period_date,
            legend,
            domain: DateDomain::unbounded(),
            tooltip: TooltipCoordinator::new(options.tie_break),
            cache: SeriesCache::new(),
            options,
            listeners: ListenerRegistry::new(),
            outside_click: None,
        };
        history.refresh_series();
        history
    }

    /// Graph, legend and limits taken from resolved configuration
    pub fn from_config(
        data: ActivityData,
        config: &ResolvedConfig,
    ) -> Result<Self, InteractionError> {
        let legend = Legend::for_graph(config.graph, &config.custom_metrics)?;
        Ok(Self::new(data, config.graph, legend, GraphOptions::from(config)))
    }

    /// Share the host's listener registry
    pub fn with_listeners(mut self, listeners: ListenerRegistry) -> Self {
        self.outside_click = None;
        self.listeners = listeners;
        self.sync_outside_click();
        self
    }

    pub fn graph(&self) -> GraphType {
        self.graph
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn date_domain(&self) -> &DateDomain {
        &self.domain
    }

    pub fn tooltip_state(&self) -> &TooltipState {
        self.tooltip.state()
    }

    pub fn analyses(&self) -> &[Analysis] {
        &self.analyses
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// All series, hidden ones included, in legend order
    pub fn series(&self) -> &[Serie] {
        self.cache.series()
    }

    pub fn visible_series(&self) -> Vec<&Serie> {
        visible_series(self.series()).collect()
    }

    /// Type of the first series, `INT` when there is none
    pub fn metric_type(&self) -> MetricType {
        self.series()
            .first()
            .map(|serie| serie.metric_type)
            .unwrap_or_default()
    }

    pub fn tick_formatter(&self) -> TickFormatter {
        TickFormatter::new(self.metric_type())
    }

    pub fn split_point_date(&self) -> Option<DateTime<Utc>> {
        self.histories
            .iter()
            .find_map(|history| history.split_point_date)
    }

    pub fn clipped_domain(&self) -> ClippedDomain {
        clip(self.series(), &self.domain)
    }

    pub fn clipped_domain_at(&self, now: DateTime<Utc>) -> ClippedDomain {
        clip_at(self.series(), &self.domain, now)
    }

    pub fn render_model(&self) -> RenderModel {
        self.render_model_for(self.clipped_domain())
    }

    pub fn render_model_at(&self, now: DateTime<Utc>) -> RenderModel {
        self.render_model_for(self.clipped_domain_at(now))
    }

    fn render_model_for(&self, domain: ClippedDomain) -> RenderModel {
        RenderModel {
            graph: self.graph,
            domain,
            series: visible_series(self.series()).cloned().collect(),
            metric_type: self.metric_type(),
            split_point_date: self.split_point_date(),
            leak_period_date: self.leak_period_date,
        }
    }

    pub fn pointer_move(&mut self, at: DateTime<Utc>, x_position: f64) {
        self.tooltip.pointer_move(self.cache.series(), at, x_position);
        self.sync_outside_click();
    }

    pub fn click(&mut self, at: DateTime<Utc>, x_position: f64) {
        self.tooltip.click(self.cache.series(), at, x_position);
        self.sync_outside_click();
    }

    pub fn step(&mut self, step: Step) {
        self.tooltip.step(self.cache.series(), step);
        self.sync_outside_click();
    }

    pub fn pointer_leave(&mut self) {
        self.tooltip.pointer_leave();
        self.sync_outside_click();
    }

    /// Click outside the chart or escape
    pub fn deselect(&mut self) {
        self.tooltip.deselect();
        self.sync_outside_click();
    }

    pub fn tooltip_payload(&self) -> Option<TooltipPayload> {
        let date = self.tooltip.state().selection()?.selected_date;
        let events = EventIndex::new(&self.analyses);
        self.tooltip
            .payload(self.series(), &events, self.supplementary_line(date))
    }

    fn supplementary_line(&self, date: DateTime<Utc>) -> Option<TooltipLine> {
        let key = self.graph.supplementary_metric()?;
        let history = self.histories.iter().find(|history| history.metric == key)?;
        let metric = find_metric(&self.metrics, key);
        let metric_type = metric
            .map(|metric| metric.metric_type)
            .unwrap_or(MetricType::Percent);
        let value = coerce_value(history.raw_value_at(date), metric_type)?;
        Some(TooltipLine {
            metric: key.to_string(),
            translated_name: metric
                .map(|metric| metric.name.clone())
                .unwrap_or_else(|| key.to_string()),
            metric_type,
            cell: TooltipCell::from_value(Some(&value), metric_type),
        })
    }

    /// Show or hide a static series, returning its new `hidden` flag
    pub fn toggle_series(&mut self, metric: &str) -> Result<bool, InteractionError> {
        self.edit_legend("toggle", metric, InteractionError::LastVisibleSeries, |legend| {
            legend.toggle(metric)
        })
    }

    pub fn add_custom_metric(&mut self, metric: &str) -> Result<(), InteractionError> {
        self.legend
            .add(metric, self.options.max_custom_metrics)
            .map_err(|e| rejected("add", metric, e))?;
        self.series_changed();
        Ok(())
    }

    pub fn remove_custom_metric(&mut self, metric: &str) -> Result<(), InteractionError> {
        self.edit_legend("remove", metric, InteractionError::LastCustomMetric, |legend| {
            legend.remove(metric)
        })
    }

    // Legend entries without data do not count: the edit is rejected when it
    // would leave a chart that had visible series with none.
    fn edit_legend<T>(
        &mut self,
        action: &str,
        metric: &str,
        emptied: InteractionError,
        edit: impl FnOnce(&mut Legend) -> Result<T, InteractionError>,
    ) -> Result<T, InteractionError> {
        let mut legend = self.legend.clone();
        let outcome = edit(&mut legend).map_err(|e| rejected(action, metric, e))?;

        let candidate = SeriesBuilder::new(&self.metrics).build(&self.histories, &legend);
        let had_visible = visible_series(self.series()).next().is_some();
        if had_visible && visible_series(&candidate).next().is_none() {
            return Err(rejected(action, metric, emptied));
        }

        self.legend = legend;
        self.series_changed();
        Ok(outcome)
    }

    /// Apply an explicit zoom reported by the renderer
    pub fn zoom(
        &mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(), InteractionError> {
        let domain = DateDomain::new(start, end);
        if let Some(span) = domain.span() {
            let min_span = Duration::milliseconds((self.options.min_zoom_hours * 3_600_000.0) as i64);
            if span < min_span {
                tracing::debug!(?span, "rejected zoom narrower than {}h", self.options.min_zoom_hours);
                return Err(InteractionError::ZoomTooNarrow {
                    min_hours: self.options.min_zoom_hours,
                });
            }
        }
        self.set_domain(domain);
        Ok(())
    }

    pub fn reset_zoom(&mut self) {
        self.set_domain(DateDomain::unbounded());
    }

    /// Swap in a freshly fetched snapshot
    pub fn replace_data(&mut self, analyses: Vec<Analysis>, histories: Vec<MeasureHistory>) {
        self.analyses = analyses;
        self.histories = histories;
        self.series_changed();
    }

    /// Rows for the "view as table" fallback, within the current domain
    pub fn data_table(&self, exporter: &TableExporter) -> DataTable {
        exporter.to_table(self.series(), &self.analyses, &self.clipped_domain())
    }

    pub fn data_table_at(&self, exporter: &TableExporter, now: DateTime<Utc>) -> DataTable {
        exporter.to_table(self.series(), &self.analyses, &self.clipped_domain_at(now))
    }

    fn set_domain(&mut self, domain: DateDomain) {
        if domain != self.domain {
            self.domain = domain;
            self.tooltip.reset();
            self.sync_outside_click();
        }
    }

    fn series_changed(&mut self) {
        self.refresh_series();
        self.tooltip.reset();
        self.sync_outside_click();
    }

    fn refresh_series(&mut self) {
        let builder = SeriesBuilder::new(&self.metrics);
        self.cache
            .get_or_build(&builder, &self.histories, &self.legend);
    }

    // Outside-click listener lives exactly as long as the pin
    fn sync_outside_click(&mut self) {
        match (self.tooltip.state().is_pinned(), self.outside_click.is_some()) {
            (true, false) => {
                self.outside_click = Some(self.listeners.subscribe(ListenerKind::Click));
            }
            (false, true) => self.outside_click = None,
            _ => {}
        }
    }
}

fn rejected(action: &str, metric: &str, error: InteractionError) -> InteractionError {
    tracing::debug!(metric, "rejected legend {}: {}", action, error);
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HistoryPoint;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn history(metric: &str, points: &[(u32, &str)]) -> MeasureHistory {
        MeasureHistory {
            metric: metric.to_string(),
            history: points
                .iter()
                .map(|(d, v)| HistoryPoint {
                    date: day(*d),
                    value: Some(v.to_string()),
                })
                .collect(),
            split_point_date: None,
        }
    }

    fn coverage_data() -> ActivityData {
        ActivityData {
            analyses: vec![],
            measures: vec![
                history("lines_to_cover", &[(1, "100"), (2, "120")]),
                history("uncovered_lines", &[(1, "40"), (2, "30")]),
                history("coverage", &[(2, "75.0")]),
            ],
            metrics: vec![Metric {
                key: "coverage".to_string(),
                name: "Coverage".to_string(),
                metric_type: MetricType::Percent,
            }],
            leak_period_date: None,
        }
    }

    #[test]
    fn test_coverage_tooltip_carries_supplementary_measure() {
        let mut graph = GraphHistory::new(
            coverage_data(),
            GraphType::Coverage,
            Legend::for_graph(GraphType::Coverage, &[]).unwrap(),
            GraphOptions::default(),
        );
        assert_eq!(graph.series().len(), 2, "coverage itself is not charted");

        graph.pointer_move(day(2), 10.0);
        let payload = graph.tooltip_payload().unwrap();
        let extra = payload.supplementary.unwrap();
        assert_eq!(extra.translated_name, "Coverage");
        assert_eq!(
            extra.cell,
            TooltipCell::Value {
                value: crate::series::YValue::Number(75.0),
                formatted: "75.0%".to_string()
            }
        );

        graph.pointer_move(day(1), 0.0);
        assert!(graph.tooltip_payload().unwrap().supplementary.is_none());
    }

    #[test]
    fn test_outside_click_listener_follows_pin() {
        let registry = ListenerRegistry::new();
        let mut graph = GraphHistory::new(
            coverage_data(),
            GraphType::Coverage,
            Legend::for_graph(GraphType::Coverage, &[]).unwrap(),
            GraphOptions::default(),
        )
        .with_listeners(registry.clone());

        graph.pointer_move(day(1), 0.0);
        assert!(!registry.is_subscribed(ListenerKind::Click));
        graph.click(day(1), 0.0);
        assert!(registry.is_subscribed(ListenerKind::Click));
        graph.deselect();
        assert!(!registry.is_subscribed(ListenerKind::Click));
    }

    #[test]
    fn test_narrow_zoom_rejected_without_side_effects() {
        let mut graph = GraphHistory::new(
            coverage_data(),
            GraphType::Coverage,
            Legend::for_graph(GraphType::Coverage, &[]).unwrap(),
            GraphOptions::default(),
        );
        graph.click(day(2), 5.0);
        let narrow = graph.zoom(Some(day(1)), Some(day(1) + Duration::hours(6)));
        assert_eq!(narrow, Err(InteractionError::ZoomTooNarrow { min_hours: 12.0 }));
        assert!(graph.zoom(Some(day(2)), Some(day(1))).is_err(), "inverted window");
        assert!(graph.date_domain().is_unbounded());
        assert!(graph.tooltip_state().is_pinned());

        graph.zoom(Some(day(1)), Some(day(2))).unwrap();
        assert!(graph.tooltip_state().is_idle(), "zoom invalidates the pin");
        assert_eq!(graph.clipped_domain(), ClippedDomain { start: day(1), end: day(2) });
    }

    #[test]
    fn test_render_model_reports_type_and_split_point() {
        let mut data = coverage_data();
        data.measures[1].split_point_date = Some(day(2));
        data.leak_period_date = Some(day(1));
        let graph = GraphHistory::new(
            data,
            GraphType::Coverage,
            Legend::for_graph(GraphType::Coverage, &[]).unwrap(),
            GraphOptions::default(),
        );
        let model = graph.render_model_at(day(10));
        assert_eq!(model.metric_type, MetricType::Int);
        assert_eq!(model.split_point_date, Some(day(2)));
        assert_eq!(model.leak_period_date, Some(day(1)));
        assert_eq!(model.domain, ClippedDomain { start: day(1), end: day(2) });
        assert_eq!(model.tick_formatter().format(&crate::series::YValue::Number(1500.0)), "1.5k");
    }

    #[test]
    fn test_replace_data_resets_tooltip() {
        let mut graph = GraphHistory::new(
            coverage_data(),
            GraphType::Coverage,
            Legend::for_graph(GraphType::Coverage, &[]).unwrap(),
            GraphOptions::default(),
        );
        graph.click(day(1), 0.0);
        graph.replace_data(vec![], vec![history("lines_to_cover", &[(5, "10")])]);
        assert!(graph.tooltip_state().is_idle());
        assert_eq!(graph.series().len(), 1);
        assert_eq!(graph.clipped_domain().start, day(5));
    }

    #[test]
    fn test_from_config_rejects_empty_custom_graph() {
        let mut config = ResolvedConfig::defaults().unwrap();
        config.graph = GraphType::Custom;
        assert_eq!(
            GraphHistory::from_config(coverage_data(), &config).err(),
            Some(InteractionError::EmptyCustomLegend)
        );

        config.custom_metrics = vec!["coverage".to_string()];
        let graph = GraphHistory::from_config(coverage_data(), &config).unwrap();
        assert_eq!(graph.series().len(), 1);
    }

    #[test]
    fn test_hiding_last_charted_series_is_rejected() {
        // no history for the coverage graph's second metric
        let mut data = coverage_data();
        data.measures.retain(|history| history.metric != "uncovered_lines");
        let mut graph = GraphHistory::new(
            data,
            GraphType::Coverage,
            Legend::for_graph(GraphType::Coverage, &[]).unwrap(),
            GraphOptions::default(),
        );
        graph.click(day(1), 0.0);

        assert_eq!(
            graph.toggle_series("lines_to_cover"),
            Err(InteractionError::LastVisibleSeries)
        );
        assert!(!graph.legend().is_hidden("lines_to_cover"), "legend left untouched");
        assert!(graph.tooltip_state().is_pinned(), "rejected edit keeps the pin");
        assert_eq!(graph.visible_series().len(), 1);

        // hiding the entry without data is still allowed
        assert_eq!(graph.toggle_series("uncovered_lines"), Ok(true));
        assert_eq!(graph.visible_series().len(), 1);
    }
}
