//! Watch engine - ties admission, sessions, sources and alerting together
//!
//! The engine accepts identifier submissions, never blocks the submitter,
//! and keeps running totals that are printed on a fixed cadence.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::admission::AdmissionController;
use crate::domain::alert::AlertTracker;
use crate::domain::monitor::{MonitorSession, MonitorStatus, SessionOutcome};
use crate::infrastructure::notify::AlertSink;
use crate::infrastructure::sources::SourceDispatcher;
use crate::shared::errors::AdmissionError;
use crate::shared::types::{MonitorSettings, SubmitContext};

/// Running totals for the lifetime of the engine
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub start_time: Instant,
    pub identifiers_submitted: u64,
    pub sessions_started: u64,
    pub sessions_triggered: u64,
    pub sessions_expired: u64,
    pub sessions_cancelled: u64,
    pub sessions_failed: u64,
    pub alerts_sent: u64,
    pub alerts_deduplicated: u64,
    pub polls_ok: u64,
    pub polls_missed: u64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            identifiers_submitted: 0,
            sessions_started: 0,
            sessions_triggered: 0,
            sessions_expired: 0,
            sessions_cancelled: 0,
            sessions_failed: 0,
            alerts_sent: 0,
            alerts_deduplicated: 0,
            polls_ok: 0,
            polls_missed: 0,
        }
    }

    fn absorb(&mut self, outcome: &SessionOutcome) {
        match outcome.status {
            MonitorStatus::Triggered => self.sessions_triggered += 1,
            MonitorStatus::Expired => self.sessions_expired += 1,
            MonitorStatus::Cancelled => self.sessions_cancelled += 1,
            MonitorStatus::Failed => self.sessions_failed += 1,
            MonitorStatus::Running => {}
        }
        if outcome.alert_sent {
            self.alerts_sent += 1;
        }
        if outcome.alert_deduplicated {
            self.alerts_deduplicated += 1;
        }
        self.polls_ok += outcome.polls_ok as u64;
        self.polls_missed += outcome.polls_missed as u64;
    }
}

impl Default for EngineStats {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WatchEngine {
    dispatcher: Arc<SourceDispatcher>,
    tracker: Arc<AlertTracker>,
    admission: Arc<AdmissionController>,
    sink: Arc<dyn AlertSink>,
    settings: MonitorSettings,
    stats: Arc<RwLock<EngineStats>>,
    cancel_tx: watch::Sender<bool>,
}

impl WatchEngine {
    pub fn new(
        dispatcher: Arc<SourceDispatcher>,
        tracker: Arc<AlertTracker>,
        admission: Arc<AdmissionController>,
        sink: Arc<dyn AlertSink>,
        settings: MonitorSettings,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            dispatcher,
            tracker,
            admission,
            sink,
            settings,
            stats: Arc::new(RwLock::new(EngineStats::new())),
            cancel_tx,
        }
    }

    /// Submit an identifier for monitoring. Returns immediately; the
    /// session queues behind the admission cap and runs on its own task.
    pub async fn submit_identifier(
        &self,
        identifier: String,
        context: SubmitContext,
    ) -> JoinHandle<Result<SessionOutcome, AdmissionError>> {
        {
            let mut stats = self.stats.write().await;
            stats.identifiers_submitted += 1;
        }
        info!(
            identifier = %identifier,
            requester = context.requester.as_deref().unwrap_or("-"),
            running = self.admission.running(),
            waiting = self.admission.waiting(),
            "identifier submitted"
        );

        let session = MonitorSession::new(
            identifier,
            self.settings.clone(),
            context,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.tracker),
            Arc::clone(&self.sink),
            self.cancel_tx.subscribe(),
        );

        let stats = Arc::clone(&self.stats);
        self.admission.admit(async move {
            {
                let mut stats = stats.write().await;
                stats.sessions_started += 1;
            }
            let outcome = session.run().await;
            stats.write().await.absorb(&outcome);
            outcome
        })
    }

    pub async fn stats(&self) -> EngineStats {
        self.stats.read().await.clone()
    }

    /// True when no session is running or queued.
    pub fn is_idle(&self) -> bool {
        self.admission.running() == 0 && self.admission.waiting() == 0
    }

    /// Print the running totals, mirrored after the periodic monitor report.
    pub async fn print_engine_stats(&self) {
        let stats = self.stats.read().await;
        let uptime = stats.start_time.elapsed();
        info!("📊 Engine stats:");
        info!("  ⏱️  Uptime: {:.0}s", uptime.as_secs_f64());
        info!(
            "  📥 Submitted: {} | started: {} | running: {} | waiting: {}",
            stats.identifiers_submitted,
            stats.sessions_started,
            self.admission.running(),
            self.admission.waiting()
        );
        info!(
            "  🏁 Triggered: {} | expired: {} | cancelled: {} | failed: {}",
            stats.sessions_triggered,
            stats.sessions_expired,
            stats.sessions_cancelled,
            stats.sessions_failed
        );
        info!(
            "  🔔 Alerts sent: {} | deduplicated: {}",
            stats.alerts_sent, stats.alerts_deduplicated
        );
        info!(
            "  📡 Polls ok: {} | missed: {}",
            stats.polls_ok, stats.polls_missed
        );
    }

    /// Signal every running session to stop and refuse new admissions.
    pub fn shutdown(&self) {
        warn!("shutting down: cancelling sessions and closing admission");
        let _ = self.cancel_tx.send(true);
        self.admission.close();
    }
}
