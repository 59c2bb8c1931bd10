//! CSV report generation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::profile::AggregatedStats;

use super::{ReportError, ReportGenerator};

/// Writes one CSV file per run with a row per profile, named by the local
/// generation timestamp.
pub struct CsvReportGenerator {
    reports_dir: PathBuf,
}

impl CsvReportGenerator {
    /// Create a generator writing into the given directory.
    #[must_use]
    pub fn new(reports_dir: &Path) -> Self {
        Self {
            reports_dir: reports_dir.to_path_buf(),
        }
    }
}

impl ReportGenerator for CsvReportGenerator {
    fn build(&self, stats: &AggregatedStats) -> Result<PathBuf, ReportError> {
        if stats.is_empty() {
            return Err(ReportError::NoData);
        }
        fs::create_dir_all(&self.reports_dir)?;

        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.reports_dir.join(format!("search_report_{stamp}.csv"));

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record([
            "Perfil",
            "Criterio",
            "Activo",
            "Ejecuciones",
            "Correos ultima busqueda",
            "Correos acumulados",
            "Ultima ejecucion",
        ])?;

        for entry in stats.values() {
            let last = entry
                .stats
                .last_execution_at
                .map(|at| at.format("%d/%m/%Y %H:%M:%S").to_string())
                .unwrap_or_default();
            writer.write_record([
                entry.profile.name.as_str(),
                entry.profile.criteria.as_str(),
                if entry.profile.is_active { "Si" } else { "No" },
                &entry.stats.total_executions.to_string(),
                &entry.stats.current_emails_found.to_string(),
                &entry.stats.total_emails_accumulated.to_string(),
                &last,
            ])?;
        }
        writer.flush().map_err(ReportError::Io)?;

        info!(path = %path.display(), profiles = stats.len(), "report written");
        Ok(path)
    }
}
