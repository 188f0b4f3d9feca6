//! Datacenter Planner Main Application
//! Main window with status panel and report viewer.

use crate::charts::StaticChartRenderer;
use crate::gui::{ReportViewer, StatusPanel, StatusPanelAction};
use crate::pipeline::{Report, StatusLevel};
use egui::SidePanel;
use tracing::{error, info};

/// Main application window over a finished pipeline run.
pub struct ReportApp {
    report: Report,
    status_panel: StatusPanel,
}

impl ReportApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, report: Report) -> Self {
        Self {
            report,
            status_panel: StatusPanel::new(),
        }
    }

    /// Hand the saved map document to the system browser
    fn handle_open_map(&mut self) {
        let Some(path) = self.report.map_path.clone() else {
            self.status_panel
                .set_notice(StatusLevel::Warning, "No map was written");
            return;
        };

        match open::that(&path) {
            Ok(()) => {
                info!(path = %path.display(), "map opened");
                self.status_panel
                    .set_notice(StatusLevel::Info, format!("Opened {}", path.display()));
            }
            Err(e) => {
                error!("failed to open map: {}", e);
                self.status_panel
                    .set_notice(StatusLevel::Error, format!("Error: {}", e));
            }
        }
    }

    /// Render the impact chart to PNG next to the map
    fn handle_export_chart(&mut self) {
        let Some(table) = &self.report.table else {
            self.status_panel
                .set_notice(StatusLevel::Warning, "No data to display in the chart.");
            return;
        };

        let path = self.report.ctx.chart_path.clone();
        match StaticChartRenderer::save_impact_chart(table, &path) {
            Ok(()) => self
                .status_panel
                .set_notice(StatusLevel::Info, format!("Chart exported: {}", path.display())),
            Err(e) => {
                error!("chart export failed: {}", e);
                self.status_panel
                    .set_notice(StatusLevel::Error, format!("Render error: {}", e));
            }
        }
    }
}

impl eframe::App for ReportApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Left panel - Status Panel
        SidePanel::left("status_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.status_panel.show(ui, &self.report);

                    match action {
                        StatusPanelAction::OpenMap => self.handle_open_map(),
                        StatusPanelAction::ExportChart => self.handle_export_chart(),
                        StatusPanelAction::None => {}
                    }
                });
            });

        // Central panel - Report Viewer
        egui::CentralPanel::default().show(ctx, |ui| {
            ReportViewer::show(ui, &self.report);
        });
    }
}
