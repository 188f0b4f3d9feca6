//! Charts module - map document, interactive plots and static export

mod map;
mod plotter;
mod renderer;

pub use map::MapDocument;
pub use plotter::{ChartPlotter, ImpactTable, CHART_TITLE};
pub use renderer::StaticChartRenderer;
