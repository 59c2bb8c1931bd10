//! Scheduled search orchestration.
//!
//! One run walks the whole pipeline: load credentials and active profiles,
//! batch-search the mailbox, record per-profile statistics, then generate
//! and optionally deliver a report. Outcomes that are expected in normal
//! operation (no active profiles, nothing found, delivery switched off)
//! complete successfully with a descriptive outcome instead of erroring.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{CredentialStore, DeliveryConfigStore};
use crate::profile::ProfileRepository;
use crate::report::{ReportDispatcher, ReportError, ReportGenerator};
use crate::schedule::ScheduledJob;
use crate::search::{MailConnector, MailSearchClient};
use crate::status::{StatusLevel, StatusSender};

/// Default lookback window for scheduled searches, in days.
pub const DEFAULT_DAYS_BACK: i64 = 30;

/// Error aborting a run before any searching happened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    /// No account credentials are configured.
    #[error("No credentials configured")]
    NoCredentials,
    /// A previous run is still in flight.
    #[error("A search run is already in progress")]
    AlreadyRunning,
    /// Storage failure while driving the pipeline.
    #[error("{0}")]
    Internal(String),
}

/// How a completed run ended. Every variant is a success; the tag records
/// how far the report chain got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// There were no active profiles to search.
    NoActiveProfiles,
    /// No profile's search succeeded; no report was generated.
    CompletedNoResults,
    /// Report generation was skipped because there were no statistics.
    ReportSkippedNoData,
    /// Report generation failed.
    ReportFailed,
    /// Report generated; delivery is switched off or unconfigured.
    GeneratedNotSent,
    /// Report generated but delivery failed.
    SendFailed,
    /// Searched, reported, and delivered.
    Completed,
}

/// Result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Profiles included in the batch.
    pub profiles_total: usize,
    /// Profiles whose search completed.
    pub profiles_succeeded: usize,
    /// Emails found across all successful profiles.
    pub emails_found: u64,
    /// One-line human summary.
    pub message: String,
}

impl RunSummary {
    fn new(
        outcome: RunOutcome,
        profiles_total: usize,
        profiles_succeeded: usize,
        emails_found: u64,
    ) -> Self {
        let message = format!(
            "{profiles_succeeded}/{profiles_total} profiles succeeded, \
             {emails_found} emails found"
        );
        Self {
            outcome,
            profiles_total,
            profiles_succeeded,
            emails_found,
            message,
        }
    }
}

/// Resets the in-flight flag when a run ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives the search-report-deliver pipeline over the configured stores.
pub struct SearchOrchestrator<C: MailConnector> {
    credentials: CredentialStore,
    profiles: ProfileRepository,
    delivery: DeliveryConfigStore,
    client: Mutex<MailSearchClient<C>>,
    generator: Arc<dyn ReportGenerator>,
    dispatcher: Arc<dyn ReportDispatcher>,
    status: StatusSender,
    days_back: i64,
    in_flight: AtomicBool,
}

impl<C: MailConnector> SearchOrchestrator<C> {
    /// Create an orchestrator over the given config directory and seams.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be prepared.
    pub fn new(
        config_dir: &Path,
        connector: C,
        generator: Arc<dyn ReportGenerator>,
        dispatcher: Arc<dyn ReportDispatcher>,
        status: StatusSender,
    ) -> crate::error::Result<Self> {
        Ok(Self {
            credentials: CredentialStore::new(config_dir)?,
            profiles: ProfileRepository::new(config_dir)?,
            delivery: DeliveryConfigStore::new(config_dir)?,
            client: Mutex::new(MailSearchClient::new(connector)),
            generator,
            dispatcher,
            status,
            days_back: DEFAULT_DAYS_BACK,
            in_flight: AtomicBool::new(false),
        })
    }

    /// Override the lookback window.
    #[must_use]
    pub const fn with_days_back(mut self, days_back: i64) -> Self {
        self.days_back = days_back;
        self
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn since_date(&self) -> NaiveDate {
        Local::now().date_naive() - Duration::days(self.days_back)
    }

    fn acquire(&self) -> Result<InFlightGuard<'_>, RunError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| RunError::AlreadyRunning)?;
        Ok(InFlightGuard(&self.in_flight))
    }

    /// Run searches for every active profile and record their statistics,
    /// without generating a report.
    ///
    /// # Errors
    ///
    /// Fails when no credentials are configured, a run is already in
    /// flight, or the stores cannot be read.
    pub async fn run_manual_search(&self) -> Result<RunSummary, RunError> {
        let _guard = self.acquire()?;
        self.search_phase().await
    }

    /// Run the full pipeline: search, record, report, deliver.
    ///
    /// Benign ends of the chain (nothing found, no report data, delivery
    /// off or failing) complete with the corresponding [`RunOutcome`];
    /// delivery failure is reported as a warning, not an error.
    ///
    /// # Errors
    ///
    /// Fails when no credentials are configured, a run is already in
    /// flight, or the stores cannot be read.
    pub async fn run_scheduled_search(&self) -> Result<RunSummary, RunError> {
        let _guard = self.acquire()?;

        let summary = self.search_phase().await?;
        if matches!(
            summary.outcome,
            RunOutcome::NoActiveProfiles | RunOutcome::CompletedNoResults
        ) {
            return Ok(summary);
        }

        let outcome = self.report_phase().await;
        Ok(RunSummary {
            outcome,
            ..summary
        })
    }

    /// Steps shared by manual and scheduled runs: credentials, profiles,
    /// batch search, statistics.
    async fn search_phase(&self) -> Result<RunSummary, RunError> {
        self.status
            .emit(StatusLevel::Info, "Iniciando busqueda de correos");

        let credentials = self
            .credentials
            .load()
            .map_err(|e| RunError::Internal(e.to_string()))?
            .ok_or(RunError::NoCredentials)?;

        let active = self
            .profiles
            .load_active()
            .map_err(|e| RunError::Internal(e.to_string()))?;
        if active.is_empty() {
            self.status
                .emit(StatusLevel::Warning, "No hay perfiles activos");
            return Ok(RunSummary::new(RunOutcome::NoActiveProfiles, 0, 0, 0));
        }

        self.status.emit(
            StatusLevel::Info,
            format!("Buscando en {} perfiles activos", active.len()),
        );

        let since = self.since_date();
        let results = {
            let mut client = self.client.lock().await;
            client
                .search_many_profiles(&credentials, &active, since)
                .await
        };

        let mut succeeded = 0_usize;
        let mut found = 0_u64;
        for (id, result) in &results {
            if result.success {
                succeeded += 1;
                found += result.emails_found;
                self.profiles
                    .record_execution(*id, result.emails_found)
                    .map_err(|e| RunError::Internal(e.to_string()))?;
                self.status.emit(
                    StatusLevel::Info,
                    format!("{}: {}", result.profile_name, result.message),
                );
            } else {
                self.status.emit(
                    StatusLevel::Warning,
                    format!("{}: {}", result.profile_name, result.message),
                );
            }
        }

        info!(
            profiles = active.len(),
            succeeded, found, "search phase complete"
        );
        if succeeded == 0 {
            self.status
                .emit(StatusLevel::Warning, "Busqueda completada sin resultados");
            return Ok(RunSummary::new(
                RunOutcome::CompletedNoResults,
                active.len(),
                0,
                found,
            ));
        }

        Ok(RunSummary::new(
            RunOutcome::Completed,
            active.len(),
            succeeded,
            found,
        ))
    }

    /// Generate the report and, when configured, deliver it. Every failure
    /// past this point is benign: the searches already ran and their
    /// statistics are recorded.
    async fn report_phase(&self) -> RunOutcome {
        let stats = match self.profiles.aggregated_stats() {
            Ok(stats) => stats,
            Err(err) => {
                warn!(error = %err, "could not load statistics for the report");
                self.status
                    .emit(StatusLevel::Warning, "No se pudo generar el informe");
                return RunOutcome::ReportFailed;
            }
        };

        let report = match self.generator.build(&stats) {
            Ok(path) => path,
            Err(ReportError::NoData) => {
                self.status
                    .emit(StatusLevel::Warning, "Sin datos para el informe");
                return RunOutcome::ReportSkippedNoData;
            }
            Err(err) => {
                warn!(error = %err, "report generation failed");
                self.status
                    .emit(StatusLevel::Warning, "No se pudo generar el informe");
                return RunOutcome::ReportFailed;
            }
        };
        self.status.emit(
            StatusLevel::Success,
            format!("Informe generado: {}", report.display()),
        );

        let delivery = match self.delivery.load() {
            Ok(delivery) => delivery,
            Err(err) => {
                warn!(error = %err, "could not load delivery configuration");
                return RunOutcome::GeneratedNotSent;
            }
        };
        if !delivery.is_ready() {
            self.status
                .emit(StatusLevel::Info, "Envio de informe desactivado");
            return RunOutcome::GeneratedNotSent;
        }

        match self.dispatcher.send(&report, &delivery).await {
            Ok(()) => {
                self.status.emit(
                    StatusLevel::Success,
                    format!("Informe enviado a {}", delivery.recipient),
                );
                RunOutcome::Completed
            }
            Err(err) => {
                warn!(error = %err, "report delivery failed");
                self.status
                    .emit(StatusLevel::Warning, "No se pudo enviar el informe");
                RunOutcome::SendFailed
            }
        }
    }
}

#[async_trait]
impl<C: MailConnector> ScheduledJob for SearchOrchestrator<C> {
    async fn run(&self) {
        match self.run_scheduled_search().await {
            Ok(summary) => {
                self.status.emit(StatusLevel::Success, summary.message);
            }
            Err(RunError::AlreadyRunning) => {
                self.status
                    .emit(StatusLevel::Warning, "previous run still active");
            }
            Err(err) => {
                self.status.emit(StatusLevel::Error, err.to_string());
            }
        }
    }
}
