//! Datacenter Planner - School Connectivity Analysis & Facility Placement
//!
//! Loads the school connectivity survey, proposes a data center location at the
//! centroid of all schools, estimates the latency/bandwidth impact and shows the
//! resulting map and chart.

mod charts;
mod config;
mod data;
mod gui;
mod pipeline;
mod stats;

use anyhow::anyhow;
use config::RunContext;
use eframe::egui;
use gui::ReportApp;
use pipeline::Pipeline;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let report = Pipeline::new(RunContext::default()).run()?;

    // Configure native options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([1000.0, 700.0])
            .with_title("Datacenter Planner"),
        ..Default::default()
    };

    eframe::run_native(
        "Datacenter Planner",
        options,
        Box::new(move |cc| Ok(Box::new(ReportApp::new(cc, report)))),
    )
    .map_err(|e| anyhow!("window error: {}", e))
}
