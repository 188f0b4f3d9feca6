//! Impact Calculator Module
//! Averages the measured metrics and projects them through an impact policy.

use crate::data::Dataset;
use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::info;

/// Latency multiplier of the default policy (20% reduction)
pub const LATENCY_FACTOR: f64 = 0.8;
/// Download/upload multiplier of the default policy (20% increase)
pub const THROUGHPUT_FACTOR: f64 = 1.2;

/// Mean latency (ms) and throughput (Mbps) across a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricAverages {
    pub latency: f64,
    pub download: f64,
    pub upload: f64,
}

/// Before/after averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactSummary {
    pub policy: String,
    pub before: MetricAverages,
    pub after: MetricAverages,
}

/// Projects post-deployment metrics from the measured averages.
pub trait ImpactPolicy {
    fn name(&self) -> &str;
    fn project(&self, before: &MetricAverages) -> MetricAverages;
}

/// Scales latency and throughput by constant factors. A placeholder model:
/// it ignores geography and the facility location entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMultiplierPolicy {
    pub latency_factor: f64,
    pub throughput_factor: f64,
}

impl Default for FixedMultiplierPolicy {
    fn default() -> Self {
        Self {
            latency_factor: LATENCY_FACTOR,
            throughput_factor: THROUGHPUT_FACTOR,
        }
    }
}

impl ImpactPolicy for FixedMultiplierPolicy {
    fn name(&self) -> &str {
        "fixed multiplier"
    }

    fn project(&self, before: &MetricAverages) -> MetricAverages {
        MetricAverages {
            latency: before.latency * self.latency_factor,
            download: before.download * self.throughput_factor,
            upload: before.upload * self.throughput_factor,
        }
    }
}

/// Handles the before/after impact estimate.
pub struct ImpactCalculator;

impl ImpactCalculator {
    /// Mean of the non-NaN values; NaN when nothing is left.
    pub fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
        let present: Vec<f64> = values.filter(|v| !v.is_nan()).collect();
        if present.is_empty() {
            return f64::NAN;
        }
        present.iter().mean()
    }

    pub fn averages(dataset: &Dataset) -> MetricAverages {
        let records = dataset.records();
        MetricAverages {
            latency: Self::nan_mean(records.iter().map(|r| r.latency)),
            download: Self::nan_mean(records.iter().map(|r| r.download_speed)),
            upload: Self::nan_mean(records.iter().map(|r| r.upload_speed)),
        }
    }

    /// `None` for an empty dataset.
    pub fn estimate(dataset: &Dataset, policy: &dyn ImpactPolicy) -> Option<ImpactSummary> {
        if dataset.is_empty() {
            return None;
        }

        let before = Self::averages(dataset);
        let after = policy.project(&before);
        info!(
            policy = policy.name(),
            latency_before = before.latency,
            latency_after = after.latency,
            "impact estimated"
        );

        Some(ImpactSummary {
            policy: policy.name().to_string(),
            before,
            after,
        })
    }
}
