//! Workbook Loader Module
//! Fetches the source spreadsheet, parses both sheets and inner-joins them using Polars.

use crate::data::processor::{DataProcessor, Dataset};
use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx, XlsxError};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, info};

/// Sheet holding school coordinates
pub const LAT_LONG_SHEET: &str = "lat long";
/// Sheet holding speed test results
pub const MEASUREMENT_SHEET: &str = "measurement data";
/// Identifier shared by both sheets
pub const JOIN_KEY: &str = "school_id_giga";

const ROW_ORDER: &str = "__row_order";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Status code: {0}")]
    Status(u16),
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] XlsxError),
    #[error("Worksheet named '{0}' not found")]
    MissingSheet(String),
    #[error("Worksheet '{0}' has no header row")]
    EmptySheet(String),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("Column '{0}' not found")]
    MissingColumn(String),
    #[error("Row {row}: '{column}' is not a numeric coordinate")]
    InvalidCoordinate { row: usize, column: String },
}

impl LoaderError {
    /// Soft failures end the run early with a status line instead of an error.
    pub fn is_soft(&self) -> bool {
        !matches!(self, LoaderError::InvalidCoordinate { .. })
    }
}

/// Source of the raw workbook bytes.
pub trait SourceFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoaderError>;
}

/// Blocking HTTP GET. No timeout and no retry: a hung server hangs the run.
pub struct HttpFetcher;

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, LoaderError> {
        let response = reqwest::blocking::get(url)?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(LoaderError::Status(status.as_u16()));
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Floats past 2^53 no longer map one-to-one onto integers.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Integer value of `f` when it holds one exactly.
fn exact_integer(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f.abs() < MAX_EXACT_INTEGER).then_some(f as i64)
}

/// Column storage picked from the cells of one sheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Int,
    Float,
    Text,
}

/// Loads the two-sheet workbook into a merged DataFrame.
pub struct DataLoader {
    fetcher: Box<dyn SourceFetcher>,
}

impl DataLoader {
    pub fn new(fetcher: Box<dyn SourceFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch, parse, join and convert into a Dataset.
    pub fn load_dataset(&self, url: &str) -> Result<Dataset, LoaderError> {
        let merged = self.load_frame(url)?;
        DataProcessor::to_dataset(&merged)
    }

    /// Fetch and parse the workbook into the merged DataFrame.
    pub fn load_frame(&self, url: &str) -> Result<DataFrame, LoaderError> {
        let bytes = self.fetcher.fetch(url)?;
        info!(bytes = bytes.len(), "fetched workbook");
        Self::parse_workbook(&bytes)
    }

    /// Parse both sheets from in-memory xlsx bytes and merge them.
    pub fn parse_workbook(bytes: &[u8]) -> Result<DataFrame, LoaderError> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
        let lat_long = Self::read_sheet(&mut workbook, LAT_LONG_SHEET)?;
        let measurements = Self::read_sheet(&mut workbook, MEASUREMENT_SHEET)?;
        debug!(
            lat_long_rows = lat_long.height(),
            measurement_rows = measurements.height(),
            "parsed sheets"
        );
        Self::merge(lat_long, measurements)
    }

    fn read_sheet<RS>(workbook: &mut Xlsx<RS>, name: &str) -> Result<DataFrame, LoaderError>
    where
        RS: std::io::Read + std::io::Seek,
    {
        if !workbook.sheet_names().iter().any(|s| s == name) {
            return Err(LoaderError::MissingSheet(name.to_string()));
        }
        let range = workbook.worksheet_range(name)?;
        Self::range_to_frame(&range, name)
    }

    /// Convert a sheet range into a DataFrame. The first row holds the column labels.
    pub fn range_to_frame(range: &Range<Data>, sheet: &str) -> Result<DataFrame, LoaderError> {
        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| LoaderError::EmptySheet(sheet.to_string()))?;
        let body: Vec<&[Data]> = rows.collect();

        let labels: Vec<String> = header
            .iter()
            .enumerate()
            .map(|(idx, cell)| match cell {
                Data::String(s) => s.clone(),
                Data::Empty => format!("Unnamed: {}", idx),
                other => other.to_string(),
            })
            .collect();

        let columns: Vec<Column> = Self::dedupe_labels(labels)
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells: Vec<&Data> = body
                    .iter()
                    .map(|row| row.get(idx).unwrap_or(&Data::Empty))
                    .collect();
                Self::build_column(name, &cells)
            })
            .collect();

        Ok(DataFrame::new(columns)?)
    }

    /// Repeated labels become `name.1`, `name.2`, ... so every column survives.
    fn dedupe_labels(labels: Vec<String>) -> Vec<String> {
        let mut seen: HashSet<String> = labels.iter().cloned().collect();
        let mut first: HashSet<String> = HashSet::new();
        let mut suffixes: HashMap<String, usize> = HashMap::new();

        labels
            .into_iter()
            .map(|label| {
                if first.insert(label.clone()) {
                    return label;
                }
                let counter = suffixes.entry(label.clone()).or_insert(0);
                loop {
                    *counter += 1;
                    let candidate = format!("{}.{}", label, counter);
                    if seen.insert(candidate.clone()) {
                        debug!(label = %label, renamed = %candidate, "duplicate column label");
                        return candidate;
                    }
                }
            })
            .collect()
    }

    fn build_column(name: &str, cells: &[&Data]) -> Column {
        // Identifiers compare as text so numeric and string ids can match
        if name == JOIN_KEY {
            let values: Vec<Option<String>> = cells.iter().map(|c| Self::cell_text(c)).collect();
            return Column::new(name.into(), values);
        }

        match Self::column_kind(cells) {
            CellKind::Int => {
                let values: Vec<Option<i64>> = cells
                    .iter()
                    .map(|c| Self::cell_int(c))
                    .collect();
                Column::new(name.into(), values)
            }
            CellKind::Float => {
                let values: Vec<Option<f64>> = cells.iter().map(|c| Self::cell_number(c)).collect();
                Column::new(name.into(), values)
            }
            CellKind::Text => {
                let values: Vec<Option<String>> =
                    cells.iter().map(|c| Self::cell_text(c)).collect();
                Column::new(name.into(), values)
            }
        }
    }

    fn column_kind(cells: &[&Data]) -> CellKind {
        let mut kind = CellKind::Int;
        for cell in cells {
            match cell {
                Data::Empty | Data::Error(_) => {}
                Data::Int(_) => {}
                Data::Float(f) => {
                    if exact_integer(*f).is_none() {
                        kind = CellKind::Float;
                    }
                }
                _ => return CellKind::Text,
            }
        }
        kind
    }

    fn cell_int(cell: &Data) -> Option<i64> {
        match cell {
            Data::Int(i) => Some(*i),
            Data::Float(f) => exact_integer(*f),
            _ => None,
        }
    }

    fn cell_number(cell: &Data) -> Option<f64> {
        match cell {
            Data::Int(i) => Some(*i as f64),
            Data::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn cell_text(cell: &Data) -> Option<String> {
        match cell {
            Data::Empty | Data::Error(_) => None,
            Data::String(s) => Some(s.clone()),
            Data::Int(i) => Some(i.to_string()),
            Data::Float(f) => Some(match exact_integer(*f) {
                Some(i) => i.to_string(),
                None => f.to_string(),
            }),
            other => Some(other.to_string()),
        }
    }

    /// Inner-join the two sheets on the shared key, keeping the lat/long sheet's row order,
    /// then trim whitespace from every column label.
    pub fn merge(lat_long: DataFrame, measurements: DataFrame) -> Result<DataFrame, LoaderError> {
        for frame in [&lat_long, &measurements] {
            if frame.column(JOIN_KEY).is_err() {
                return Err(LoaderError::MissingColumn(JOIN_KEY.to_string()));
            }
        }

        let mut merged = lat_long
            .lazy()
            .with_row_index(ROW_ORDER, None)
            .inner_join(measurements.lazy(), col(JOIN_KEY), col(JOIN_KEY))
            .sort(
                [ROW_ORDER],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;
        merged.drop_in_place(ROW_ORDER)?;

        let trimmed: Vec<String> = merged
            .get_column_names()
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        merged.set_column_names(trimmed)?;

        info!(rows = merged.height(), "merged sheets");
        Ok(merged)
    }
}
