//! Report Viewer Widget
//! Central scrollable panel: map preview on top, impact chart below.

use crate::charts::{ChartPlotter, ImpactTable, MapDocument, CHART_TITLE};
use crate::config::{CHART_HEIGHT, MAP_DISPLAY_HEIGHT};
use crate::pipeline::Report;
use egui::{Color32, RichText, ScrollArea};

const CARD_SPACING: f32 = 15.0;
const CARD_BORDER: Color32 = Color32::from_rgb(100, 149, 237);

pub struct ReportViewer;

impl ReportViewer {
    pub fn show(ui: &mut egui::Ui, report: &Report) {
        if report.map.is_none() && report.table.is_none() {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        }

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if let Some(doc) = &report.map {
                    Self::map_card(ui, doc);
                    ui.add_space(CARD_SPACING);
                }

                match &report.table {
                    Some(table) => Self::chart_card(ui, table),
                    None => {
                        ui.label(
                            RichText::new("No data to display in the chart.")
                                .size(14.0)
                                .color(Color32::GRAY),
                        );
                    }
                }
            });
    }

    fn card(ui: &mut egui::Ui, title: &str, body: impl FnOnce(&mut egui::Ui)) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(2.0, CARD_BORDER))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.label(RichText::new(title).size(18.0).strong().color(CARD_BORDER));
                    ui.add_space(8.0);
                    body(ui);
                });
            });
    }

    fn map_card(ui: &mut egui::Ui, doc: &MapDocument) {
        let title = format!(
            "🗺 {} schools, {} proposed facility",
            doc.schools.len(),
            doc.facilities.len()
        );
        Self::card(ui, &title, |ui| {
            ChartPlotter::draw_map_preview(ui, doc, MAP_DISPLAY_HEIGHT);
        });
    }

    fn chart_card(ui: &mut egui::Ui, table: &ImpactTable) {
        Self::card(ui, CHART_TITLE, |ui| {
            ChartPlotter::draw_impact_chart(ui, table, CHART_HEIGHT);

            ui.add_space(8.0);
            egui::Grid::new("impact_values")
                .striped(true)
                .spacing([20.0, 4.0])
                .show(ui, |ui| {
                    ui.label(RichText::new("Metric").strong());
                    ui.label(RichText::new("Before").strong());
                    ui.label(RichText::new("After").strong());
                    ui.end_row();
                    for row in &table.rows {
                        ui.label(row.metric);
                        ui.label(format!("{:.2}", row.before));
                        ui.label(format!("{:.2}", row.after));
                        ui.end_row();
                    }
                });
        });
    }
}
