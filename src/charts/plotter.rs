//! Chart Plotter Module
//! Interactive grouped bar chart and map preview using egui_plot.

use crate::charts::map::{MapDocument, FACILITY_POPUP};
use crate::stats::ImpactSummary;
use egui::Color32;
use egui_plot::{Bar, BarChart, GridMark, Legend, MarkerShape, Plot, PlotPoints, Points};
use serde::Serialize;

pub const CHART_TITLE: &str = "Impact of Data Center on Latency and Bandwidth";
pub const VALUE_AXIS_LABEL: &str = "Speed / Latency";
pub const CATEGORY_AXIS_LABEL: &str = "Metric";

pub const METRIC_LABELS: [&str; 3] = [
    "Latency (ms)",
    "Download Speed (Mbps)",
    "Upload Speed (Mbps)",
];

/// Series colors
pub const BEFORE_COLOR: Color32 = Color32::from_rgb(99, 110, 250); // Blue
pub const AFTER_COLOR: Color32 = Color32::from_rgb(239, 85, 59); // Red
pub const SCHOOL_COLOR: Color32 = Color32::from_rgb(52, 152, 219);
pub const FACILITY_COLOR: Color32 = Color32::from_rgb(220, 53, 69);

/// Bar width and offset from the category center
pub const BAR_WIDTH: f64 = 0.35;
pub const BAR_OFFSET: f64 = 0.18;

/// One metric with its before/after values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRow {
    pub metric: &'static str,
    pub before: f64,
    pub after: f64,
}

/// Tidy three-row table behind the impact chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactTable {
    pub rows: Vec<ImpactRow>,
}

impl ImpactTable {
    pub fn from_summary(summary: &ImpactSummary) -> Self {
        let before = [
            summary.before.latency,
            summary.before.download,
            summary.before.upload,
        ];
        let after = [
            summary.after.latency,
            summary.after.download,
            summary.after.upload,
        ];

        let rows = METRIC_LABELS
            .iter()
            .zip(before.iter().zip(after.iter()))
            .map(|(&metric, (&before, &after))| ImpactRow {
                metric,
                before,
                after,
            })
            .collect();

        Self { rows }
    }

    /// Largest finite value in the table, 0.0 if none.
    pub fn max_value(&self) -> f64 {
        self.rows
            .iter()
            .flat_map(|r| [r.before, r.after])
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }
}

/// Creates the interactive plots using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Bars for one series, offset left (before) or right (after) of each category.
    pub fn series_bars(table: &ImpactTable, after: bool) -> Vec<Bar> {
        let offset = if after { BAR_OFFSET } else { -BAR_OFFSET };
        table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let value = if after { row.after } else { row.before };
                Bar::new(i as f64 + offset, value)
                    .width(BAR_WIDTH)
                    .name(row.metric)
            })
            .collect()
    }

    /// Grouped bar chart: one category per metric, Before/After bars side by side.
    pub fn draw_impact_chart(ui: &mut egui::Ui, table: &ImpactTable, height: f32) {
        let labels: Vec<String> = table.rows.iter().map(|r| r.metric.to_string()).collect();
        let categories = labels.len();

        Plot::new("impact_chart")
            .height(height)
            .legend(Legend::default())
            .allow_scroll(false)
            .include_y(0.0)
            .x_axis_label(CATEGORY_AXIS_LABEL)
            .y_axis_label(VALUE_AXIS_LABEL)
            .x_grid_spacer(move |_input| {
                (0..categories)
                    .map(|i| GridMark {
                        value: i as f64,
                        step_size: 1.0,
                    })
                    .collect()
            })
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() < 1e-6 && idx >= 0.0 {
                    labels.get(idx as usize).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(
                    BarChart::new(Self::series_bars(table, false))
                        .color(BEFORE_COLOR)
                        .name("Before"),
                );
                plot_ui.bar_chart(
                    BarChart::new(Self::series_bars(table, true))
                        .color(AFTER_COLOR)
                        .name("After"),
                );
            });
    }

    /// Scatter preview of the map document: x is longitude, y is latitude.
    pub fn draw_map_preview(ui: &mut egui::Ui, doc: &MapDocument, height: f32) {
        Plot::new("map_preview")
            .height(height)
            .data_aspect(1.0)
            .legend(Legend::default())
            .x_axis_label("Longitude")
            .y_axis_label("Latitude")
            .show(ui, |plot_ui| {
                let schools: PlotPoints = doc.schools.iter().map(|m| [m.lon, m.lat]).collect();
                plot_ui.points(
                    Points::new(schools)
                        .radius(3.0)
                        .color(SCHOOL_COLOR)
                        .name("Schools"),
                );

                let facilities: PlotPoints =
                    doc.facilities.iter().map(|m| [m.lon, m.lat]).collect();
                plot_ui.points(
                    Points::new(facilities)
                        .radius(8.0)
                        .shape(MarkerShape::Diamond)
                        .color(FACILITY_COLOR)
                        .name(FACILITY_POPUP),
                );
            });
    }
}
