//! Report generation and dispatch seams.
//!
//! The orchestrator drives these traits; the CSV generator is the built-in
//! implementation and dispatch is left to the host application's transport.

mod csv_report;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::DeliveryConfig;
use crate::profile::AggregatedStats;

pub use csv_report::CsvReportGenerator;

/// Error producing a report file.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// There are no statistics to report on.
    #[error("No data to report")]
    NoData,
    /// The report file could not be written.
    #[error("Report I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The report rows could not be serialized.
    #[error("Report serialization error: {0}")]
    Csv(#[from] csv::Error),
}

/// Error delivering a generated report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Delivery is not configured or not enabled.
    #[error("Report delivery is not configured")]
    NotConfigured,
    /// The transport failed.
    #[error("Report delivery failed: {0}")]
    Transport(String),
}

/// Builds a report file from aggregated profile statistics.
pub trait ReportGenerator: Send + Sync {
    /// Write the report and return its path.
    ///
    /// # Errors
    ///
    /// Returns `NoData` when there is nothing to report, otherwise I/O or
    /// serialization errors.
    fn build(&self, stats: &AggregatedStats) -> Result<PathBuf, ReportError>;
}

/// Delivers a generated report file.
#[async_trait]
pub trait ReportDispatcher: Send + Sync {
    /// Send the report according to the delivery configuration.
    ///
    /// # Errors
    ///
    /// Returns `NotConfigured` when delivery should not be attempted, or a
    /// transport error.
    async fn send(
        &self,
        report: &Path,
        delivery: &DeliveryConfig,
    ) -> Result<(), SendError>;
}
