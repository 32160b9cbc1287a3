//! Rejected interactions
//!
//! A rejected interaction leaves every piece of graph state untouched. The UI
//! reads the variant to render the corresponding control as disabled.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InteractionError {
    #[error("cannot hide the last visible series")]
    LastVisibleSeries,
    #[error("cannot remove the last custom metric")]
    LastCustomMetric,
    #[error("custom graphs need at least one metric")]
    EmptyCustomLegend,
    #[error("metric '{0}' is not part of the legend")]
    UnknownMetric(String),
    #[error("metric '{0}' is already part of the legend")]
    DuplicateMetric(String),
    #[error("custom graphs hold at most {0} metrics")]
    CustomMetricLimit(usize),
    #[error("operation is not available for this legend mode")]
    WrongLegendMode,
    #[error("zoom window must span at least {min_hours} hours")]
    ZoomTooNarrow { min_hours: f64 },
}
