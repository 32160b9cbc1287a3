//! Activity graph core library - series, zoom, tooltip and table state for project activity charts

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Series order follows legend order, never hash order
// - Point dates within a serie are strictly increasing
// - At least one series stays visible on static graphs
// - The tooltip never interpolates between data points
// - A rejected interaction leaves all state untouched
// - Rendering is a pure function of graph state (plus `now` for empty domains)

pub mod config;
pub mod date;
pub mod domain;
pub mod error;
pub mod events;
pub mod format;
pub mod graph;
pub mod legend;
pub mod listeners;
pub mod model;
pub mod series;
pub mod table;
pub mod tooltip;

pub use config::ResolvedConfig;
pub use domain::{ClippedDomain, DateDomain};
pub use error::InteractionError;
pub use events::EventIndex;
pub use graph::{GraphHistory, GraphOptions, RenderModel};
pub use legend::{GraphType, Legend};
pub use model::{ActivityData, Analysis, AnalysisEvent, MeasureHistory, Metric, MetricType};
pub use series::{Serie, SeriesBuilder, YValue};
pub use table::{render_text, DataTable, TableExporter};
pub use tooltip::{Step, TieBreak, TooltipCoordinator, TooltipPayload, TooltipState};
