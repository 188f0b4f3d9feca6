//! Data module - workbook loading and record extraction

mod loader;
mod processor;
#[cfg(test)]
pub(crate) mod test_workbook;

pub use loader::{DataLoader, HttpFetcher, LoaderError, SourceFetcher};
pub use processor::{Dataset, MeasurementRecord};
