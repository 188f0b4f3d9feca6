//! Analysis Pipeline
//! Load -> locate -> estimate -> render, run once per invocation.
//!
//! Every stage receives the immutable `RunContext`. An empty dataset moves the run
//! to `Stage::EmptyAbort`, which is terminal; only malformed-but-present data and
//! artifact write failures come back as errors.

use crate::charts::{ImpactTable, MapDocument};
use crate::config::{RunContext, MAP_ZOOM_START};
use crate::data::{DataLoader, Dataset, HttpFetcher, LoaderError, SourceFetcher};
use crate::stats::{
    CentroidPoint, FixedMultiplierPolicy, ImpactCalculator, ImpactPolicy, ImpactSummary, Locator,
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Pipeline states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    EmptyAbort,
    Locating,
    Estimating,
    Rendering,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub text: String,
}

/// User-facing status text, in the order it was produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLog {
    lines: Vec<StatusLine>,
}

impl StatusLog {
    pub fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        info!("{}", text);
        self.push(StatusLevel::Info, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        let text = text.into();
        warn!("{}", text);
        self.push(StatusLevel::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        let text = text.into();
        error!("{}", text);
        self.push(StatusLevel::Error, text);
    }

    fn push(&mut self, level: StatusLevel, text: String) {
        self.lines.push(StatusLine { level, text });
    }

    pub fn lines(&self) -> &[StatusLine] {
        &self.lines
    }

    #[cfg(test)]
    pub fn contains(&self, text: &str) -> bool {
        self.lines.iter().any(|l| l.text.contains(text))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed,
    Aborted { reason: String },
}

/// Everything one run produced, handed to the display surface.
#[derive(Debug, Clone)]
pub struct Report {
    pub ctx: RunContext,
    pub stage: Stage,
    pub outcome: RunOutcome,
    pub status: StatusLog,
    pub dataset: Dataset,
    pub centroids: Option<Vec<CentroidPoint>>,
    pub map: Option<MapDocument>,
    pub map_path: Option<PathBuf>,
    pub impact: Option<ImpactSummary>,
    pub table: Option<ImpactTable>,
}

impl Report {
    fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            stage: Stage::Loading,
            outcome: RunOutcome::Completed,
            status: StatusLog::default(),
            dataset: Dataset::default(),
            centroids: None,
            map: None,
            map_path: None,
            impact: None,
            table: None,
        }
    }

    fn abort(mut self, reason: &str) -> Self {
        self.status.warn(reason);
        self.stage = Stage::EmptyAbort;
        self.outcome = RunOutcome::Aborted {
            reason: reason.to_string(),
        };
        self
    }

    /// Proposed facility location (first cluster center).
    pub fn facility(&self) -> Option<CentroidPoint> {
        self.centroids.as_ref().and_then(|c| c.first().copied())
    }
}

pub struct Pipeline {
    ctx: RunContext,
    loader: DataLoader,
    policy: Box<dyn ImpactPolicy>,
}

impl Pipeline {
    pub fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            loader: DataLoader::new(Box::new(HttpFetcher)),
            policy: Box::new(FixedMultiplierPolicy::default()),
        }
    }

    pub fn with_fetcher(mut self, fetcher: Box<dyn SourceFetcher>) -> Self {
        self.loader = DataLoader::new(fetcher);
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn ImpactPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn run(&self) -> Result<Report> {
        let mut report = Report::new(self.ctx.clone());

        // 1. Load
        report
            .status
            .info(format!("Loading data from {}...", self.ctx.source_url));
        let dataset = match self.loader.load_dataset(&self.ctx.source_url) {
            Ok(dataset) => {
                report.status.info("Data loaded successfully");
                dataset
            }
            Err(LoaderError::Status(code)) => {
                report
                    .status
                    .error(format!("Failed to load data. Status code: {}", code));
                return Ok(report.abort("No data to process, exiting application."));
            }
            Err(e) if e.is_soft() => {
                report.status.error(format!("Error loading data: {}", e));
                return Ok(report.abort("No data to process, exiting application."));
            }
            Err(e) => return Err(e).context("measurement data is malformed"),
        };

        if dataset.is_empty() {
            return Ok(report.abort("No data to process, exiting application."));
        }
        info!(records = dataset.len(), "dataset ready");
        report.dataset = dataset;

        // 2. Locate
        report.stage = Stage::Locating;
        let centroids = match Locator::locate(&report.dataset, &self.ctx)? {
            Some(centroids) => centroids,
            None => {
                report.status.warn("Dataframe is empty, skipping clustering");
                return Ok(report.abort("Could not find data center, exiting application."));
            }
        };
        report.centroids = Some(centroids);

        // 3. Estimate
        report.stage = Stage::Estimating;
        report.impact = ImpactCalculator::estimate(&report.dataset, self.policy.as_ref());
        if report.impact.is_none() {
            report
                .status
                .warn("Dataframe is empty, skipping impact calculation");
        }

        // 4. Render
        report.stage = Stage::Rendering;
        let centroids = report.centroids.as_deref().unwrap_or_default();
        match MapDocument::build(&report.dataset, centroids, MAP_ZOOM_START) {
            Some(doc) => {
                doc.save(&self.ctx.map_path).with_context(|| {
                    format!("Failed to write map: {}", self.ctx.map_path.display())
                })?;
                report.map_path = Some(self.ctx.map_path.clone());
                report.map = Some(doc);
            }
            None => report
                .status
                .warn("Dataframe is empty, skipping map plotting"),
        }

        match &report.impact {
            Some(summary) => report.table = Some(ImpactTable::from_summary(summary)),
            None => report.status.warn("No data to display in the chart."),
        }

        report.stage = Stage::Done;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_workbook::{
        Cell, FixtureFetcher, WorkbookBuilder, JOIN_KEY, LAT_LONG_SHEET, MEASUREMENT_SHEET,
    };
    use crate::stats::MetricAverages;

    const EPS: f64 = 1e-9;

    fn output_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dc_planner_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn pipeline(name: &str, fetcher: FixtureFetcher) -> Pipeline {
        let ctx = RunContext::default().with_output_dir(&output_dir(name));
        Pipeline::new(ctx).with_fetcher(Box::new(fetcher))
    }

    #[test]
    fn single_school_runs_to_completion() {
        let report = pipeline(
            "single",
            FixtureFetcher::Bytes(WorkbookBuilder::single_school_fixture()),
        )
        .run()
        .unwrap();

        assert_eq!(report.stage, Stage::Done);
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.dataset.len(), 1);

        let facility = report.facility().unwrap();
        assert!((facility.latitude - 13.1).abs() < EPS);
        assert!((facility.longitude - (-59.6)).abs() < EPS);

        let impact = report.impact.as_ref().unwrap();
        assert!((impact.before.latency - 50.0).abs() < EPS);
        assert!((impact.before.download - 10.0).abs() < EPS);
        assert!((impact.before.upload - 2.0).abs() < EPS);
        assert!((impact.after.latency - 40.0).abs() < EPS);
        assert!((impact.after.download - 12.0).abs() < EPS);
        assert!((impact.after.upload - 2.4).abs() < EPS);

        let map_path = report.map_path.as_ref().unwrap();
        let html = std::fs::read_to_string(map_path).unwrap();
        assert!(html.contains("Proposed Data Center"));
        assert_eq!(report.table.as_ref().unwrap().rows.len(), 3);

        let texts: Vec<&str> = report.status.lines().iter().map(|l| l.text.as_str()).collect();
        assert!(texts[0].starts_with("Loading data from"));
        assert_eq!(texts[1], "Data loaded successfully");
    }

    #[test]
    fn disjoint_sheets_abort_without_error() {
        let report = pipeline(
            "disjoint",
            FixtureFetcher::Bytes(WorkbookBuilder::disjoint_fixture()),
        )
        .run()
        .unwrap();

        assert_eq!(report.stage, Stage::EmptyAbort);
        assert!(matches!(report.outcome, RunOutcome::Aborted { .. }));
        assert!(report.dataset.is_empty());
        assert!(report.centroids.is_none());
        assert!(report.impact.is_none());
        assert!(report.map.is_none());
        assert!(report.map_path.is_none());
        assert!(report
            .status
            .contains("No data to process, exiting application."));
    }

    #[test]
    fn http_failure_is_reported_as_status_text() {
        let report = pipeline("status", FixtureFetcher::Status(503)).run().unwrap();
        assert_eq!(report.stage, Stage::EmptyAbort);
        assert!(report.status.contains("Failed to load data. Status code: 503"));
        assert!(report
            .status
            .lines()
            .iter()
            .any(|l| l.level == StatusLevel::Error));
    }

    #[test]
    fn malformed_workbook_aborts_softly() {
        let report = pipeline("garbage", FixtureFetcher::Bytes(b"PK garbage".to_vec()))
            .run()
            .unwrap();
        assert_eq!(report.stage, Stage::EmptyAbort);
        assert!(report.status.contains("Error loading data:"));
    }

    #[test]
    fn non_numeric_coordinates_end_the_run_with_an_error() {
        let bytes = WorkbookBuilder::new()
            .sheet(
                LAT_LONG_SHEET,
                vec![
                    vec![Cell::text(JOIN_KEY), Cell::text("latitude"), Cell::text("longitude")],
                    vec![Cell::number(1.0), Cell::text("unknown"), Cell::number(-59.6)],
                ],
            )
            .sheet(
                MEASUREMENT_SHEET,
                vec![
                    vec![
                        Cell::text(JOIN_KEY),
                        Cell::text("download_speed"),
                        Cell::text("upload_speed"),
                        Cell::text("latency"),
                    ],
                    vec![
                        Cell::number(1.0),
                        Cell::number(10.0),
                        Cell::number(2.0),
                        Cell::number(50.0),
                    ],
                ],
            )
            .build();

        let result = pipeline("malformed", FixtureFetcher::Bytes(bytes)).run();
        assert!(result.is_err());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let bytes = WorkbookBuilder::new()
            .sheet(
                LAT_LONG_SHEET,
                vec![
                    vec![Cell::text(JOIN_KEY), Cell::text("latitude"), Cell::text("longitude")],
                    vec![Cell::text("a"), Cell::number(13.05), Cell::number(-59.61)],
                    vec![Cell::text("b"), Cell::number(13.21), Cell::number(-59.52)],
                    vec![Cell::text("c"), Cell::number(13.17), Cell::number(-59.63)],
                ],
            )
            .sheet(
                MEASUREMENT_SHEET,
                vec![
                    vec![
                        Cell::text(JOIN_KEY),
                        Cell::text("download_speed"),
                        Cell::text("upload_speed"),
                        Cell::text("latency"),
                    ],
                    vec![
                        Cell::text("c"),
                        Cell::number(25.5),
                        Cell::number(5.0),
                        Cell::number(31.0),
                    ],
                    vec![Cell::text("a"), Cell::number(8.0), Cell::number(1.5), Cell::number(72.0)],
                    vec![
                        Cell::text("b"),
                        Cell::number(14.0),
                        Cell::number(3.25),
                        Cell::number(48.0),
                    ],
                ],
            )
            .build();

        let first = pipeline("idem_1", FixtureFetcher::Bytes(bytes.clone()))
            .run()
            .unwrap();
        let second = pipeline("idem_2", FixtureFetcher::Bytes(bytes)).run().unwrap();

        assert_eq!(first.dataset.len(), 3);
        assert_eq!(first.centroids, second.centroids);
        assert_eq!(first.impact, second.impact);
    }

    struct Halve;

    impl ImpactPolicy for Halve {
        fn name(&self) -> &str {
            "halve"
        }

        fn project(&self, before: &MetricAverages) -> MetricAverages {
            MetricAverages {
                latency: before.latency / 2.0,
                download: before.download / 2.0,
                upload: before.upload / 2.0,
            }
        }
    }

    #[test]
    fn injected_policy_drives_the_projection() {
        let report = pipeline(
            "policy",
            FixtureFetcher::Bytes(WorkbookBuilder::single_school_fixture()),
        )
        .with_policy(Box::new(Halve))
        .run()
        .unwrap();

        let impact = report.impact.unwrap();
        assert_eq!(impact.policy, "halve");
        assert!((impact.after.latency - 25.0).abs() < EPS);
    }
}
