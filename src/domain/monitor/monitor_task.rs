//! Per-identifier monitoring session
//!
//! A session polls the dispatcher once per tick, accumulates trading volume,
//! and alerts at most once. Ticks are scheduled at absolute offsets from the
//! session start so processing time never accumulates into drift.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::alert::AlertTracker;
use crate::infrastructure::notify::AlertSink;
use crate::infrastructure::sources::SourceDispatcher;
use crate::shared::errors::DispatchError;
use crate::shared::types::{AlertPayload, Interval, MonitorSettings, SubmitContext};

/// Session lifecycle. `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Running,
    Triggered,
    Expired,
    Cancelled,
    Failed,
}

/// Mutable per-session state, owned exclusively by its task
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub identifier: String,
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub tick_index: u32,
    pub accumulated_volume: f64,
    pub threshold: f64,
    pub status: MonitorStatus,
}

/// Summary returned when a session terminates
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub identifier: String,
    pub session_id: Uuid,
    pub status: MonitorStatus,
    pub accumulated_volume: f64,
    pub ticks_completed: u32,
    pub alert_sent: bool,
    pub alert_deduplicated: bool,
    pub polls_ok: u32,
    pub polls_missed: u32,
}

/// One bounded-duration monitoring session for one identifier
pub struct MonitorSession {
    state: MonitorState,
    settings: MonitorSettings,
    context: SubmitContext,
    dispatcher: Arc<SourceDispatcher>,
    tracker: Arc<AlertTracker>,
    sink: Arc<dyn AlertSink>,
    cancel: watch::Receiver<bool>,
}

enum TickEval {
    /// Threshold not crossed yet, keep going.
    Below,
    /// Crossed and an alert went out (or failed delivery, still terminal).
    Alerted,
    /// Crossed but inside the cooldown window; session ends quietly.
    Deduplicated,
}

impl MonitorSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identifier: String,
        settings: MonitorSettings,
        context: SubmitContext,
        dispatcher: Arc<SourceDispatcher>,
        tracker: Arc<AlertTracker>,
        sink: Arc<dyn AlertSink>,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        let started_at = Utc::now();
        let window = settings.tick_interval * settings.max_ticks;
        let deadline = started_at
            + chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::minutes(5));
        let state = MonitorState {
            identifier,
            session_id: Uuid::new_v4(),
            started_at,
            deadline,
            tick_index: 0,
            accumulated_volume: 0.0,
            threshold: settings.volume_threshold,
            status: MonitorStatus::Running,
        };
        Self {
            state,
            settings,
            context,
            dispatcher,
            tracker,
            sink,
            cancel,
        }
    }

    /// Run the session to completion. Tick failures are absorbed; only an
    /// internal dispatcher fault ends the session as `Failed`.
    pub async fn run(mut self) -> SessionOutcome {
        let started = Instant::now();
        let deadline = started + self.settings.tick_interval * self.settings.max_ticks;
        let mut ticks_done = 0u32;
        let mut polls_ok = 0u32;
        let mut polls_missed = 0u32;
        let mut alert_sent = false;
        let mut alert_deduplicated = false;

        info!(
            identifier = %self.state.identifier,
            session_id = %self.state.session_id,
            threshold = self.state.threshold,
            max_ticks = self.settings.max_ticks,
            "🚀 monitoring session started"
        );

        for tick in 0..self.settings.max_ticks {
            self.state.tick_index = tick;

            // Each tick wakes at an absolute offset from the start.
            let wake_at = started + self.settings.tick_interval * tick;
            if !self.wait_until(wake_at).await {
                self.state.status = MonitorStatus::Cancelled;
                info!(identifier = %self.state.identifier, "session cancelled");
                return self.outcome(tick, alert_sent, alert_deduplicated, polls_ok, polls_missed);
            }

            // Slow polls can push a session past its window. The deadline is
            // observed here, at the suspension point, never mid-poll.
            if Instant::now() >= deadline {
                warn!(
                    identifier = %self.state.identifier,
                    tick = tick + 1,
                    "deadline reached, skipping remaining ticks"
                );
                break;
            }

            match self
                .dispatcher
                .resolve(&self.state.identifier, Interval::shortest())
                .await
            {
                Ok(snapshot) => {
                    polls_ok += 1;
                    self.state.accumulated_volume += snapshot.volume;
                    info!(
                        identifier = %self.state.identifier,
                        tick = tick + 1,
                        tick_volume = snapshot.volume,
                        accumulated = self.state.accumulated_volume,
                        price = snapshot.close,
                        "📊 poll complete"
                    );
                }
                Err(DispatchError::NoDataAvailable(_)) => {
                    // A missed sample is a detection-quality issue, not a
                    // session failure.
                    polls_missed += 1;
                    warn!(
                        identifier = %self.state.identifier,
                        tick = tick + 1,
                        "no data available this tick, continuing"
                    );
                }
                Err(DispatchError::Internal(msg)) => {
                    self.state.status = MonitorStatus::Failed;
                    error!(
                        identifier = %self.state.identifier,
                        session_id = %self.state.session_id,
                        "internal dispatch error, session failed: {msg}"
                    );
                    return self.outcome(
                        tick + 1,
                        alert_sent,
                        alert_deduplicated,
                        polls_ok,
                        polls_missed,
                    );
                }
            }
            ticks_done = tick + 1;

            match self.evaluate_threshold().await {
                TickEval::Below => {}
                TickEval::Alerted => {
                    alert_sent = true;
                    self.state.status = MonitorStatus::Triggered;
                    return self.outcome(
                        tick + 1,
                        alert_sent,
                        alert_deduplicated,
                        polls_ok,
                        polls_missed,
                    );
                }
                TickEval::Deduplicated => {
                    alert_deduplicated = true;
                    self.state.status = MonitorStatus::Triggered;
                    return self.outcome(
                        tick + 1,
                        alert_sent,
                        alert_deduplicated,
                        polls_ok,
                        polls_missed,
                    );
                }
            }
        }

        // Deadline reached without a trigger: one final evaluation before
        // declaring the session expired.
        let status = match self.evaluate_threshold().await {
            TickEval::Below => MonitorStatus::Expired,
            TickEval::Alerted => {
                alert_sent = true;
                MonitorStatus::Triggered
            }
            TickEval::Deduplicated => {
                alert_deduplicated = true;
                MonitorStatus::Triggered
            }
        };
        self.state.status = status;

        info!(
            identifier = %self.state.identifier,
            session_id = %self.state.session_id,
            status = ?status,
            accumulated = self.state.accumulated_volume,
            polls_ok,
            polls_missed,
            "✅ monitoring session finished"
        );
        self.outcome(
            ticks_done,
            alert_sent,
            alert_deduplicated,
            polls_ok,
            polls_missed,
        )
    }

    /// Sleep until `wake_at`, returning false if cancelled. Cancellation is
    /// cooperative: it is observed here and never mid-poll.
    async fn wait_until(&mut self, wake_at: Instant) -> bool {
        if *self.cancel.borrow() {
            return false;
        }
        loop {
            tokio::select! {
                _ = sleep_until(wake_at) => return true,
                changed = self.cancel.changed() => {
                    if changed.is_err() || *self.cancel.borrow() {
                        return false;
                    }
                }
            }
        }
    }

    /// Step 4 of the tick algorithm, also reused as the final check: a
    /// strictly-greater threshold comparison followed by the atomic dedup
    /// gate and at most one sink invocation.
    async fn evaluate_threshold(&mut self) -> TickEval {
        if self.state.accumulated_volume <= self.state.threshold {
            return TickEval::Below;
        }

        let now = Utc::now();
        if !self
            .tracker
            .try_alert(&self.state.identifier, self.settings.alert_cooldown, now)
        {
            info!(
                identifier = %self.state.identifier,
                accumulated = self.state.accumulated_volume,
                "threshold crossed but alert deduplicated by cooldown"
            );
            return TickEval::Deduplicated;
        }

        let payload = AlertPayload {
            identifier: self.state.identifier.clone(),
            accumulated_volume: self.state.accumulated_volume,
            threshold: self.state.threshold,
            tick_index: self.state.tick_index,
            alert_count_24h: self.tracker.alert_count_24h(&self.state.identifier, now),
            timestamp: now,
            destination: self.context.destination.clone(),
        };

        warn!(
            identifier = %self.state.identifier,
            accumulated = self.state.accumulated_volume,
            threshold = self.state.threshold,
            tick = self.state.tick_index + 1,
            "🔔 volume threshold crossed, sending alert"
        );

        // Delivery failure does not reopen the session.
        if let Err(err) = self.sink.send_alert(&payload).await {
            warn!(
                identifier = %self.state.identifier,
                %err,
                "alert delivery failed, session still ends triggered"
            );
        }
        TickEval::Alerted
    }

    fn outcome(
        &self,
        ticks_completed: u32,
        alert_sent: bool,
        alert_deduplicated: bool,
        polls_ok: u32,
        polls_missed: u32,
    ) -> SessionOutcome {
        SessionOutcome {
            identifier: self.state.identifier.clone(),
            session_id: self.state.session_id,
            status: self.state.status,
            accumulated_volume: self.state.accumulated_volume,
            ticks_completed,
            alert_sent,
            alert_deduplicated,
            polls_ok,
            polls_missed,
        }
    }
}
