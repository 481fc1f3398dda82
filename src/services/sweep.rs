//! Auto-check sweep control.
//!
//! At most one sweep runs at a time. A sweep can be started inline or
//! detached onto the runtime, and stopped cooperatively: the stop flag is
//! polled between brands, so the brand in flight always completes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::activity::{ActivityAction, ActivityEntry};
use crate::repositories::ActivitySink;
use crate::services::run_service::{RunService, SweepProgress, SweepResult};

/// What started a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepSource {
    /// Requested over the API
    Manual,
    /// Kicked off when the server boots
    Startup,
}

impl SweepSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepSource::Manual => "manual",
            SweepSource::Startup => "startup",
        }
    }
}

/// Counts of the last finished sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub total_brands: usize,
    pub ok_count: usize,
    pub fail_count: usize,
    pub stopped: bool,
}

/// Snapshot returned by [`SweepController::status`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepStatus {
    pub is_running: bool,
    pub stop_requested: bool,
    pub last_run_started_at: Option<DateTime<Utc>>,
    pub last_run_finished_at: Option<DateTime<Utc>>,
    pub last_run_source: Option<SweepSource>,
    pub last_run_summary: Option<SweepSummary>,
    pub last_error: Option<String>,
    pub progress: SweepProgress,
}

/// Clears the running flag when the sweep that claimed it ends, however it ends.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SweepController {
    runs: Arc<RunService>,
    activity: Arc<dyn ActivitySink>,
    running: Arc<AtomicBool>,
    stop_requested: AtomicBool,
    status: Mutex<SweepStatus>,
}

impl SweepController {
    pub fn new(runs: Arc<RunService>, activity: Arc<dyn ActivitySink>) -> Self {
        Self {
            runs,
            activity,
            running: Arc::new(AtomicBool::new(false)),
            stop_requested: AtomicBool::new(false),
            status: Mutex::new(SweepStatus::default()),
        }
    }

    fn claim(&self, source: SweepSource) -> Result<RunningGuard, AppError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::AlreadyRunning)?;
        self.stop_requested.store(false, Ordering::Release);
        self.update_status(|status| {
            status.last_run_started_at = Some(Utc::now());
            status.last_run_source = Some(source);
            status.last_error = None;
            status.progress = SweepProgress::default();
        });
        Ok(RunningGuard(self.running.clone()))
    }

    fn update_status(&self, update: impl FnOnce(&mut SweepStatus)) {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        update(&mut status);
    }

    /// Run a sweep to completion on the current task.
    ///
    /// # Errors
    ///
    /// - `AlreadyRunning`: another sweep holds the controller
    /// - whatever loading the brand list failed with
    pub async fn run(&self, source: SweepSource) -> Result<SweepResult, AppError> {
        let guard = self.claim(source)?;
        self.execute(source, guard).await
    }

    /// Start a sweep in the background and return immediately.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` when a sweep is in progress.
    pub fn start_detached(self: &Arc<Self>, source: SweepSource) -> Result<(), AppError> {
        let guard = self.claim(source)?;
        let controller = Arc::clone(self);

        tokio::spawn(async move {
            if let Err(e) = controller.execute(source, guard).await {
                tracing::error!("Auto check sweep failed: {}", e);
            }
        });

        Ok(())
    }

    /// Ask the running sweep to stop after its current brand.
    ///
    /// Returns `false` when no sweep is running.
    pub async fn request_stop(&self) -> bool {
        if !self.running.load(Ordering::Acquire) {
            return false;
        }

        self.stop_requested.store(true, Ordering::Release);
        self.update_status(|status| status.stop_requested = true);
        self.activity
            .record(ActivityEntry::new(ActivityAction::AutoStop).with_note("Stop requested"))
            .await;

        tracing::info!("Auto check stop requested");
        true
    }

    pub fn status(&self) -> SweepStatus {
        let mut snapshot = self
            .status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        snapshot.is_running = self.running.load(Ordering::Acquire);
        snapshot.stop_requested = self.stop_requested.load(Ordering::Acquire);
        snapshot
    }

    async fn execute(&self, source: SweepSource, _guard: RunningGuard) -> Result<SweepResult, AppError> {
        self.activity
            .record(
                ActivityEntry::new(ActivityAction::AutoStart)
                    .with_note("Auto check started")
                    .with_metadata(json!({ "source": source.as_str() })),
            )
            .await;
        tracing::info!(source = source.as_str(), "Auto check sweep started");

        let outcome = self
            .runs
            .run_auto_check_for_all_brands(
                || self.stop_requested.load(Ordering::Acquire),
                |progress| self.update_status(|status| status.progress = progress),
            )
            .await;

        let finished_at = Utc::now();
        match &outcome {
            Ok(result) => {
                let summary = SweepSummary {
                    total_brands: result.outcomes.len(),
                    ok_count: result.ok_count(),
                    fail_count: result.fail_count(),
                    stopped: result.stopped,
                };
                tracing::info!(
                    ok = summary.ok_count,
                    failed = summary.fail_count,
                    stopped = summary.stopped,
                    "Auto check sweep finished"
                );

                self.activity
                    .record(
                        ActivityEntry::new(ActivityAction::AutoCheck)
                            .with_note(format!(
                                "Auto check finished: {} ok, {} failed",
                                summary.ok_count, summary.fail_count
                            ))
                            .with_metadata(json!({
                                "ok": summary.ok_count,
                                "failed": summary.fail_count,
                                "stopped": summary.stopped,
                                "source": source.as_str(),
                                "outcomes": result.outcomes,
                            })),
                    )
                    .await;

                self.update_status(|status| {
                    status.last_run_finished_at = Some(finished_at);
                    status.last_run_summary = Some(summary);
                });
            }
            Err(e) => {
                let message = e.to_string();
                self.update_status(|status| {
                    status.last_run_finished_at = Some(finished_at);
                    status.last_error = Some(message);
                });
            }
        }

        self.stop_requested.store(false, Ordering::Release);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryActivity;
    use crate::services::testing::{FakeProvider, fixture};

    #[tokio::test]
    async fn test_run_records_status_and_activity() {
        let fx = fixture(FakeProvider::new(&["https://example.com"]).failing_for("BBBB"));
        fx.catalog.add_brand("AAAA");
        fx.catalog.add_brand("BBBB");
        let activity = Arc::new(MemoryActivity::default());
        let controller = SweepController::new(fx.service.clone(), activity.clone());

        let result = controller.run(SweepSource::Manual).await.unwrap();
        assert_eq!(result.ok_count(), 1);

        let status = controller.status();
        assert!(!status.is_running);
        assert!(status.last_run_finished_at.is_some());
        let summary = status.last_run_summary.unwrap();
        assert_eq!(summary.total_brands, 2);
        assert_eq!(summary.fail_count, 1);
        assert_eq!(status.progress.processed_brands, 2);

        assert_eq!(activity.actions(), vec!["auto_start", "auto_check"]);
    }

    #[tokio::test]
    async fn test_only_one_sweep_at_a_time() {
        let fx = fixture(FakeProvider::new(&[]));
        fx.catalog.add_brand("AAAA");
        let controller = SweepController::new(fx.service.clone(), Arc::new(MemoryActivity::default()));

        let guard = controller.claim(SweepSource::Manual).unwrap();
        assert!(matches!(controller.run(SweepSource::Manual).await, Err(AppError::AlreadyRunning)));
        assert!(controller.status().is_running);

        drop(guard);
        assert!(!controller.status().is_running);
        assert!(controller.run(SweepSource::Manual).await.is_ok());
    }

    #[tokio::test]
    async fn test_stop_is_refused_when_idle() {
        let fx = fixture(FakeProvider::new(&[]));
        let activity = Arc::new(MemoryActivity::default());
        let controller = SweepController::new(fx.service.clone(), activity.clone());

        assert!(!controller.request_stop().await);
        assert!(activity.actions().is_empty());
    }

    #[tokio::test]
    async fn test_stop_requested_before_first_brand() {
        let fx = fixture(FakeProvider::new(&["https://example.com"]));
        for code in ["B1", "B2", "B3"] {
            fx.catalog.add_brand(code);
        }
        let activity = Arc::new(MemoryActivity::default());
        let controller = SweepController::new(fx.service.clone(), activity.clone());

        let guard = controller.claim(SweepSource::Manual).unwrap();
        assert!(controller.request_stop().await);
        assert!(controller.status().stop_requested);

        let result = controller.execute(SweepSource::Manual, guard).await.unwrap();

        assert!(result.stopped);
        assert!(result.outcomes.is_empty());
        assert_eq!(fx.provider.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(activity.actions(), vec!["auto_stop", "auto_start", "auto_check"]);

        let status = controller.status();
        assert!(!status.is_running);
        assert!(!status.stop_requested);
        assert!(status.last_run_summary.unwrap().stopped);
    }

    #[tokio::test]
    async fn test_start_detached_completes_in_background() {
        let fx = fixture(FakeProvider::new(&["https://example.com"]));
        fx.catalog.add_brand("AAAA");
        let activity = Arc::new(MemoryActivity::default());
        let controller = Arc::new(SweepController::new(fx.service.clone(), activity.clone()));

        controller.start_detached(SweepSource::Startup).unwrap();
        assert!(matches!(controller.start_detached(SweepSource::Startup), Err(AppError::AlreadyRunning)));

        for _ in 0..100 {
            if !controller.status().is_running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let status = controller.status();
        assert!(!status.is_running);
        assert_eq!(status.last_run_source, Some(SweepSource::Startup));
        assert_eq!(status.last_run_summary.map(|s| s.ok_count), Some(1));
        assert_eq!(fx.runs.runs.lock().unwrap().len(), 1);
    }
}
