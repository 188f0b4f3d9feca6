//! GUI module - User interface components

mod app;
mod report_viewer;
mod status_panel;

pub use app::ReportApp;
pub use report_viewer::ReportViewer;
pub use status_panel::{StatusPanel, StatusPanelAction};
