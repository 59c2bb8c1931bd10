//! The schedule engine: background trigger loop with explicit lifecycle.
//!
//! The engine owns the single current [`ScheduleConfig`], translates it into
//! concrete recurring triggers, and runs a one-second polling loop that fires
//! a job for each due trigger. Job bodies run on their own spawned task so a
//! slow mail operation never blocks the loop. Firing is at-least-once per
//! due instant; ticks missed while the process slept are not backfilled.
//!
//! Stopping only prevents future firings. An in-flight job run completes
//! cooperatively and is never cancelled.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::Result;

use super::config::{ScheduleConfig, ScheduleConfigError};
use super::store::ScheduleConfigStore;
use super::trigger::{build_triggers, TriggerSpec};

/// Wall-clock source, injectable so the trigger loop is testable without
/// real sleeping.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

/// The process clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// The job the engine fires at each due trigger.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Run one job instance. Must not panic; any failure belongs in the
    /// job's own status reporting.
    async fn run(&self);
}

/// Error starting the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    /// No schedule configuration has been saved.
    #[error("No schedule configuration")]
    NoConfiguration,
    /// The current configuration is disabled.
    #[error("Scheduling is disabled")]
    Disabled,
    /// The current configuration does not validate.
    #[error("Invalid schedule configuration: {0}")]
    InvalidConfig(#[from] ScheduleConfigError),
}

/// Point-in-time view of the engine, safe to request at any moment.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    /// Whether the background loop is running.
    pub is_running: bool,
    /// Whether a configuration has been saved.
    pub has_config: bool,
    /// Whether the saved configuration enables scheduling.
    pub enabled: bool,
    /// Variant tag of the saved configuration.
    pub schedule_kind: Option<&'static str>,
    /// Human description of the schedule.
    pub description: Option<String>,
    /// Next trigger instant, formatted `%d/%m/%Y %H:%M:%S`.
    pub next_trigger: Option<String>,
    /// Number of active triggers.
    pub trigger_count: usize,
}

struct TriggerEntry {
    spec: TriggerSpec,
    next_due: NaiveDateTime,
}

/// How long `stop` waits for the loop task to exit.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Schedule engine with explicit lifecycle. The host application owns
/// exactly one instance; there is no ambient global state.
pub struct ScheduleEngine {
    store: ScheduleConfigStore,
    clock: Arc<dyn Clock>,
    config: Mutex<Option<ScheduleConfig>>,
    running: Arc<AtomicBool>,
    triggers: Arc<Mutex<Vec<TriggerEntry>>>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
    loop_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ScheduleEngine {
    /// Create an engine rooted at the given config directory, loading any
    /// previously saved configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory or an existing configuration
    /// file cannot be read.
    pub fn new(config_dir: &Path) -> Result<Self> {
        Self::with_clock(config_dir, Arc::new(SystemClock))
    }

    /// Create an engine with an injected clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory or an existing configuration
    /// file cannot be read.
    pub fn with_clock(config_dir: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = ScheduleConfigStore::new(config_dir)?;
        let config = store.load()?;
        Ok(Self {
            store,
            clock,
            config: Mutex::new(config),
            running: Arc::new(AtomicBool::new(false)),
            triggers: Arc::new(Mutex::new(Vec::new())),
            stop_tx: Mutex::new(None),
            loop_handle: tokio::sync::Mutex::new(None),
        })
    }

    /// The currently saved configuration.
    #[must_use]
    pub fn current_config(&self) -> Option<ScheduleConfig> {
        self.config.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Validate and persist a configuration, replacing the current one
    /// wholesale.
    ///
    /// If the engine is running and the new configuration disables
    /// scheduling, the loop is stopped as part of the save. Enabling does
    /// not implicitly start the loop; the caller decides when to `start`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid configuration or an I/O
    /// error if persisting fails.
    pub async fn save_config(&self, config: ScheduleConfig) -> Result<()> {
        config.validate()?;
        self.store.save(&config)?;

        let disable = !config.enabled;
        if let Ok(mut current) = self.config.lock() {
            *current = Some(config);
        }
        if disable && self.is_running() {
            info!("schedule disabled by save, stopping loop");
            self.stop().await;
        }
        Ok(())
    }

    /// Whether the background loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the background loop, firing `job` at each due trigger.
    ///
    /// A no-op success when already running.
    ///
    /// # Errors
    ///
    /// Fails with `NoConfiguration` or `Disabled` when not applicable, or
    /// with the configuration's validation error.
    pub async fn start(&self, job: Arc<dyn ScheduledJob>) -> std::result::Result<(), StartError> {
        if self.is_running() {
            return Ok(());
        }

        let config = self
            .current_config()
            .ok_or(StartError::NoConfiguration)?;
        if !config.enabled {
            return Err(StartError::Disabled);
        }

        let specs = build_triggers(&config)?;
        let now = self.clock.now();
        let entries: Vec<TriggerEntry> = specs
            .into_iter()
            .map(|spec| {
                let next_due = spec.next_fire(now);
                TriggerEntry { spec, next_due }
            })
            .collect();
        let trigger_count = entries.len();
        if let Ok(mut triggers) = self.triggers.lock() {
            *triggers = entries;
        }

        let (tx, mut rx) = watch::channel(false);
        let running = Arc::clone(&self.running);
        let triggers = Arc::clone(&self.triggers);
        let clock = Arc::clone(&self.clock);

        // Mark running before the loop task can take its first tick.
        self.running.store(true, Ordering::SeqCst);
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!("scheduler loop started");
            loop {
                tokio::select! {
                    _ = rx.changed() => break,
                    _ = tick.tick() => {
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }
                        let now = clock.now();
                        fire_due(&triggers, now, &job);
                    }
                }
            }
            debug!("scheduler loop exited");
        });

        if let Ok(mut stop_tx) = self.stop_tx.lock() {
            *stop_tx = Some(tx);
        }
        *self.loop_handle.lock().await = Some(handle);
        info!(triggers = trigger_count, "scheduler started");
        Ok(())
    }

    /// Stop the background loop and clear all triggers.
    ///
    /// Safe to call at any time, idempotent. Waits up to three seconds for
    /// the loop task to exit; an in-flight job run is not interrupted.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let tx = self.stop_tx.lock().ok().and_then(|mut guard| guard.take());
        if let Some(tx) = tx {
            let _ = tx.send(true);
        }

        let handle = self.loop_handle.lock().await.take();
        if let Some(handle) = handle {
            if tokio::time::timeout(STOP_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("scheduler loop did not exit within the stop timeout");
            }
        }

        if let Ok(mut triggers) = self.triggers.lock() {
            triggers.clear();
        }
        info!("scheduler stopped");
    }

    /// Derive the current status. Never fails.
    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        let config = self.current_config();
        let mut status = SchedulerStatus {
            is_running: self.is_running(),
            has_config: config.is_some(),
            ..SchedulerStatus::default()
        };

        if let Some(config) = config {
            status.enabled = config.enabled;
            if config.enabled {
                status.schedule_kind = Some(config.kind_name());
                status.description = Some(config.description());
            }
        }

        if let Ok(triggers) = self.triggers.lock() {
            status.trigger_count = triggers.len();
            status.next_trigger = triggers
                .iter()
                .map(|t| t.next_due)
                .min()
                .map(|due| due.format("%d/%m/%Y %H:%M:%S").to_string());
        }

        status
    }
}

/// Fire every due trigger, rescheduling each from `now` and spawning the job
/// body on its own task so the loop never blocks on it.
fn fire_due(
    triggers: &Arc<Mutex<Vec<TriggerEntry>>>,
    now: NaiveDateTime,
    job: &Arc<dyn ScheduledJob>,
) {
    let Ok(mut entries) = triggers.lock() else {
        return;
    };
    for entry in entries.iter_mut() {
        if now >= entry.next_due {
            debug!(due = %entry.next_due, "trigger fired");
            entry.next_due = entry.spec.next_fire(now);
            let job = Arc::clone(job);
            tokio::spawn(async move {
                job.run().await;
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schedule::config::{IntervalUnit, ScheduleKind};
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    /// Clock driven by tokio's (pausable) time, anchored at a fixed base.
    struct TestClock {
        base: NaiveDateTime,
        started: tokio::time::Instant,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                base: NaiveDate::from_ymd_opt(2024, 1, 15)
                    .unwrap()
                    .and_hms_opt(8, 0, 0)
                    .unwrap(),
                started: tokio::time::Instant::now(),
            }
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> NaiveDateTime {
            let elapsed =
                ChronoDuration::from_std(self.started.elapsed()).unwrap_or_default();
            self.base + elapsed
        }
    }

    struct CountingJob {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl ScheduledJob for CountingJob {
        async fn run(&self) {
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn interval_config(minutes: u32) -> ScheduleConfig {
        ScheduleConfig {
            enabled: true,
            kind: ScheduleKind::Interval {
                amount: minutes,
                unit: IntervalUnit::Minutes,
            },
        }
    }

    #[tokio::test]
    async fn start_without_config_fails() {
        let dir = TempDir::new().unwrap();
        let engine = ScheduleEngine::new(dir.path()).unwrap();
        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });
        assert_eq!(engine.start(job).await, Err(StartError::NoConfiguration));
    }

    #[tokio::test]
    async fn start_with_disabled_config_fails() {
        let dir = TempDir::new().unwrap();
        let engine = ScheduleEngine::new(dir.path()).unwrap();
        engine
            .save_config(ScheduleConfig {
                enabled: false,
                ..interval_config(5)
            })
            .await
            .unwrap();

        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });
        assert_eq!(engine.start(job).await, Err(StartError::Disabled));
    }

    #[tokio::test]
    async fn save_config_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let engine = ScheduleEngine::new(dir.path()).unwrap();
        assert!(engine.save_config(interval_config(0)).await.is_err());
        assert!(engine.current_config().is_none());
    }

    #[tokio::test]
    async fn config_survives_restart() {
        let dir = TempDir::new().unwrap();
        {
            let engine = ScheduleEngine::new(dir.path()).unwrap();
            engine.save_config(interval_config(10)).await.unwrap();
        }
        let engine = ScheduleEngine::new(dir.path()).unwrap();
        assert_eq!(engine.current_config(), Some(interval_config(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_trigger_fires_job() {
        let dir = TempDir::new().unwrap();
        let engine =
            ScheduleEngine::with_clock(dir.path(), Arc::new(TestClock::new())).unwrap();
        engine.save_config(interval_config(1)).await.unwrap();

        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });
        engine.start(Arc::clone(&job) as Arc<dyn ScheduledJob>).await.unwrap();
        assert!(engine.is_running());

        // First due instant is one minute after start.
        tokio::time::sleep(Duration::from_secs(61)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(job.runs.load(Ordering::SeqCst) >= 1);

        engine.stop().await;
        assert!(!engine.is_running());

        // No further firings after stop.
        let after_stop = job.runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(120)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(job.runs.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_idempotent_and_stop_is_safe_twice() {
        let dir = TempDir::new().unwrap();
        let engine =
            ScheduleEngine::with_clock(dir.path(), Arc::new(TestClock::new())).unwrap();
        engine.save_config(interval_config(5)).await.unwrap();

        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });
        engine.start(Arc::clone(&job) as Arc<dyn ScheduledJob>).await.unwrap();
        engine.start(Arc::clone(&job) as Arc<dyn ScheduledJob>).await.unwrap();
        assert!(engine.is_running());

        engine.stop().await;
        engine.stop().await;
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_save_stops_running_loop() {
        let dir = TempDir::new().unwrap();
        let engine =
            ScheduleEngine::with_clock(dir.path(), Arc::new(TestClock::new())).unwrap();
        engine.save_config(interval_config(5)).await.unwrap();

        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });
        engine.start(job).await.unwrap();
        assert!(engine.is_running());

        engine
            .save_config(ScheduleConfig {
                enabled: false,
                ..interval_config(5)
            })
            .await
            .unwrap();
        assert!(!engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn status_reflects_configuration_and_triggers() {
        let dir = TempDir::new().unwrap();
        let engine =
            ScheduleEngine::with_clock(dir.path(), Arc::new(TestClock::new())).unwrap();

        let status = engine.status();
        assert!(!status.is_running);
        assert!(!status.has_config);
        assert!(status.next_trigger.is_none());

        engine.save_config(interval_config(30)).await.unwrap();
        let job = Arc::new(CountingJob {
            runs: AtomicUsize::new(0),
        });
        engine.start(job).await.unwrap();

        let status = engine.status();
        assert!(status.is_running);
        assert!(status.has_config);
        assert!(status.enabled);
        assert_eq!(status.schedule_kind, Some("interval"));
        assert_eq!(status.description.as_deref(), Some("Every 30 minutes"));
        assert_eq!(status.trigger_count, 1);
        // Base clock is 2024-01-15 08:00, so the first due instant is 08:30.
        assert_eq!(status.next_trigger.as_deref(), Some("15/01/2024 08:30:00"));

        engine.stop().await;
        assert_eq!(engine.status().trigger_count, 0);
    }
}
