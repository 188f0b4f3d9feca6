//! Stats module - facility location and impact estimation

mod calculator;
mod kmeans;

pub use calculator::{
    FixedMultiplierPolicy, ImpactCalculator, ImpactPolicy, ImpactSummary, MetricAverages,
};
pub use kmeans::{CentroidPoint, Locator};
