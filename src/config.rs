//! Run Context Module
//! Compiled-in constants and the immutable context threaded through each stage.

use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Spreadsheet holding the "lat long" and "measurement data" sheets.
pub const DEFAULT_SOURCE_URL: &str =
    "https://huggingface.co/spaces/engralimalik/lace/resolve/main/data%20barbados.xlsx";

/// Number of proposed facility locations.
pub const DEFAULT_CLUSTER_COUNT: usize = 1;

/// Seed for k-means++ initialisation
pub const KMEANS_SEED: u64 = 0;

pub const MAP_OUTPUT_PATH: &str = "map.html";
pub const CHART_OUTPUT_PATH: &str = "impact_chart.png";

/// Initial zoom level of the interactive map
pub const MAP_ZOOM_START: u8 = 10;

/// Display heights (points) of the embedded map and the impact chart
pub const MAP_DISPLAY_HEIGHT: f32 = 600.0;
pub const CHART_HEIGHT: f32 = 400.0;

/// Immutable settings for a single pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub source_url: String,
    pub cluster_count: NonZeroUsize,
    pub seed: u64,
    pub map_path: PathBuf,
    pub chart_path: PathBuf,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            cluster_count: NonZeroUsize::new(DEFAULT_CLUSTER_COUNT).unwrap_or(NonZeroUsize::MIN),
            seed: KMEANS_SEED,
            map_path: PathBuf::from(MAP_OUTPUT_PATH),
            chart_path: PathBuf::from(CHART_OUTPUT_PATH),
        }
    }
}

impl RunContext {
    /// Same context with both artifacts placed under `dir`.
    pub fn with_output_dir(mut self, dir: &std::path::Path) -> Self {
        self.map_path = dir.join(MAP_OUTPUT_PATH);
        self.chart_path = dir.join(CHART_OUTPUT_PATH);
        self
    }
}
