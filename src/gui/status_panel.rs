//! Status Panel Widget
//! Left side panel with the run summary, status log and artifact actions.

use crate::pipeline::{Report, RunOutcome, StatusLevel};
use egui::{Color32, RichText, ScrollArea};

const ERROR_COLOR: Color32 = Color32::from_rgb(220, 53, 69);
const WARNING_COLOR: Color32 = Color32::from_rgb(255, 193, 7);
const SUCCESS_COLOR: Color32 = Color32::from_rgb(40, 167, 69);

/// Left side panel showing what the run did and what it wrote.
#[derive(Default)]
pub struct StatusPanel {
    notice: Option<(StatusLevel, String)>,
}

impl StatusPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result of the last button action
    pub fn set_notice(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.notice = Some((level, text.into()));
    }

    fn level_color(level: StatusLevel) -> Color32 {
        match level {
            StatusLevel::Info => Color32::GRAY,
            StatusLevel::Warning => WARNING_COLOR,
            StatusLevel::Error => ERROR_COLOR,
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, report: &Report) -> StatusPanelAction {
        let mut action = StatusPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🏫 Datacenter Planner")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new("School connectivity survey")
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Source Section =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.label(RichText::new(&report.ctx.source_url).size(11.0).monospace());
                ui.add_space(4.0);
                ui.label(
                    RichText::new(format!("{} schools joined", report.dataset.len())).size(12.0),
                );
                if let Some(facility) = report.facility() {
                    ui.label(
                        RichText::new(format!(
                            "Facility: {:.5}, {:.5}",
                            facility.latitude, facility.longitude
                        ))
                        .size(12.0)
                        .color(ERROR_COLOR),
                    );
                }
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Actions =====
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(report.map_path.is_some(), |ui| {
                let label = RichText::new("🗺 Open interactive map").size(16.0);
                let button = egui::Button::new(label).min_size(egui::vec2(200.0, 35.0));
                if ui.add(button).clicked() {
                    action = StatusPanelAction::OpenMap;
                }
            });

            ui.add_space(8.0);

            ui.add_enabled_ui(report.table.is_some(), |ui| {
                let button = egui::Button::new(RichText::new("📄 Export chart PNG").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(button).clicked() {
                    action = StatusPanelAction::ExportChart;
                }
            });
        });

        if let Some((level, text)) = &self.notice {
            ui.add_space(5.0);
            ui.vertical_centered(|ui| {
                ui.label(RichText::new(text).size(11.0).color(Self::level_color(*level)));
            });
        }

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status Section =====
        ui.label(RichText::new("📊 Status").size(14.0).strong());
        ui.add_space(5.0);

        let (badge, badge_color) = match &report.outcome {
            RunOutcome::Completed => ("Complete".to_string(), SUCCESS_COLOR),
            RunOutcome::Aborted { reason } => (reason.clone(), ERROR_COLOR),
        };
        ui.label(RichText::new(badge).size(12.0).strong().color(badge_color));
        ui.add_space(5.0);

        ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
            for line in report.status.lines() {
                ui.label(
                    RichText::new(&line.text)
                        .size(11.0)
                        .color(Self::level_color(line.level)),
                );
            }
        });

        action
    }
}

/// Actions triggered by the status panel
#[derive(Debug, Clone, PartialEq)]
pub enum StatusPanelAction {
    None,
    OpenMap,
    ExportChart,
}
