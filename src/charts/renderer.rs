//! Static Chart Renderer
//! Draws the before/after impact chart with plotters and encodes it as PNG.
//!
//! Layout:
//! 1. Title centered above the plot
//! 2. One category per metric on the x axis, Before/After bars side by side
//! 3. Legend in the upper right corner

use crate::charts::plotter::{
    ImpactTable, AFTER_COLOR, BAR_OFFSET, BAR_WIDTH, BEFORE_COLOR, CATEGORY_AXIS_LABEL,
    CHART_TITLE, VALUE_AXIS_LABEL,
};
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const EXPORT_WIDTH: u32 = 1200;
pub const EXPORT_HEIGHT: u32 = 800;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing error: {0}")]
    Drawing(String),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Pixel buffer does not match {0}x{1}")]
    Buffer(u32, u32),
}

fn drawing_error<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Drawing(err.to_string())
}

fn egui_to_rgb(color: egui::Color32) -> RGBColor {
    RGBColor(color.r(), color.g(), color.b())
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render the impact chart into PNG bytes.
    pub fn render_impact_chart_to_bytes(
        table: &ImpactTable,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, RenderError> {
        let mut buffer = vec![0u8; (width * height * 3) as usize];

        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(drawing_error)?;
            Self::draw_impact_chart(&root, table)?;
            root.present().map_err(drawing_error)?;
        }

        let img = RgbImage::from_raw(width, height, buffer)
            .ok_or(RenderError::Buffer(width, height))?;
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    /// Render and write the chart to `path`, replacing any previous export.
    pub fn save_impact_chart(table: &ImpactTable, path: &Path) -> Result<(), RenderError> {
        let png = Self::render_impact_chart_to_bytes(table, EXPORT_WIDTH, EXPORT_HEIGHT)?;
        fs::write(path, png)?;
        info!(path = %path.display(), "impact chart exported");
        Ok(())
    }

    fn draw_impact_chart(
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        table: &ImpactTable,
    ) -> Result<(), RenderError> {
        let categories = table.rows.len();
        let y_max = (table.max_value() * 1.15).max(1.0);
        let labels: Vec<&str> = table.rows.iter().map(|r| r.metric).collect();

        let mut chart = ChartBuilder::on(root)
            .caption(CHART_TITLE, ("sans-serif", 26))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5f64..(categories as f64 - 0.5), 0f64..y_max)
            .map_err(drawing_error)?;

        let format_category = |x: &f64| {
            let idx = x.round();
            if (x - idx).abs() < 1e-6 && idx >= 0.0 {
                labels.get(idx as usize).map(|s| s.to_string()).unwrap_or_default()
            } else {
                String::new()
            }
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(categories)
            .x_label_formatter(&format_category)
            .x_desc(CATEGORY_AXIS_LABEL)
            .y_desc(VALUE_AXIS_LABEL)
            .label_style(("sans-serif", 16))
            .draw()
            .map_err(drawing_error)?;

        let series = [
            ("Before", -BAR_OFFSET, egui_to_rgb(BEFORE_COLOR), false),
            ("After", BAR_OFFSET, egui_to_rgb(AFTER_COLOR), true),
        ];

        for (name, offset, color, after) in series {
            chart
                .draw_series(table.rows.iter().enumerate().map(|(i, row)| {
                    let value = if after { row.after } else { row.before };
                    let value = if value.is_finite() { value } else { 0.0 };
                    let center = i as f64 + offset;
                    Rectangle::new(
                        [(center - BAR_WIDTH / 2.0, 0.0), (center + BAR_WIDTH / 2.0, value)],
                        color.filled(),
                    )
                }))
                .map_err(drawing_error)?
                .label(name)
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled())
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(drawing_error)?;

        Ok(())
    }
}
