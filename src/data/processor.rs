//! Dataset Processor Module
//! Turns the merged DataFrame into typed measurement records.

use crate::data::loader::{LoaderError, JOIN_KEY};
use polars::prelude::*;
use serde::Serialize;

pub const LATITUDE_COL: &str = "latitude";
pub const LONGITUDE_COL: &str = "longitude";
pub const NAME_COL: &str = "school_name";
pub const DOWNLOAD_COL: &str = "download_speed";
pub const UPLOAD_COL: &str = "upload_speed";
pub const LATENCY_COL: &str = "latency";

/// One row of the joined table. Speeds in Mbps, latency in ms; missing metrics are NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub school_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub school_name: Option<String>,
    pub download_speed: f64,
    pub upload_speed: f64,
    pub latency: f64,
}

/// Ordered collection of joined records for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<MeasurementRecord>,
}

impl Dataset {
    pub fn new(records: Vec<MeasurementRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    /// (latitude, longitude) feature vectors in record order.
    pub fn coordinates(&self) -> Vec<[f64; 2]> {
        self.records
            .iter()
            .map(|r| [r.latitude, r.longitude])
            .collect()
    }
}

/// Handles DataFrame to record conversion.
pub struct DataProcessor;

impl DataProcessor {
    /// Convert the merged frame into a Dataset.
    ///
    /// Coordinates must be numeric on every row; speed and latency nulls become NaN.
    pub fn to_dataset(df: &DataFrame) -> Result<Dataset, LoaderError> {
        let ids = Self::typed_column(df, JOIN_KEY, &DataType::String)?;
        let ids = ids.str()?;
        let lat = Self::typed_column(df, LATITUDE_COL, &DataType::Float64)?;
        let lat = lat.f64()?;
        let lon = Self::typed_column(df, LONGITUDE_COL, &DataType::Float64)?;
        let lon = lon.f64()?;
        let download = Self::typed_column(df, DOWNLOAD_COL, &DataType::Float64)?;
        let download = download.f64()?;
        let upload = Self::typed_column(df, UPLOAD_COL, &DataType::Float64)?;
        let upload = upload.f64()?;
        let latency = Self::typed_column(df, LATENCY_COL, &DataType::Float64)?;
        let latency = latency.f64()?;

        let names = match df.column(NAME_COL) {
            Ok(col) => Some(col.cast(&DataType::String)?),
            Err(_) => None,
        };
        let names = names.as_ref().map(|c| c.str()).transpose()?;

        let mut records = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            // Inner join never yields null keys
            let Some(school_id) = ids.get(i) else {
                continue;
            };

            let latitude = Self::coordinate(lat.get(i), i, LATITUDE_COL)?;
            let longitude = Self::coordinate(lon.get(i), i, LONGITUDE_COL)?;

            records.push(MeasurementRecord {
                school_id: school_id.to_string(),
                latitude,
                longitude,
                school_name: names.and_then(|n| n.get(i)).map(str::to_string),
                download_speed: download.get(i).unwrap_or(f64::NAN),
                upload_speed: upload.get(i).unwrap_or(f64::NAN),
                latency: latency.get(i).unwrap_or(f64::NAN),
            });
        }

        Ok(Dataset::new(records))
    }

    fn typed_column(df: &DataFrame, name: &str, dtype: &DataType) -> Result<Column, LoaderError> {
        let column = df
            .column(name)
            .map_err(|_| LoaderError::MissingColumn(name.to_string()))?;
        Ok(column.cast(dtype)?)
    }

    fn coordinate(value: Option<f64>, row: usize, column: &str) -> Result<f64, LoaderError> {
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| LoaderError::InvalidCoordinate {
                row,
                column: column.to_string(),
            })
    }
}
