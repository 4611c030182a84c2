use std::{
    sync::{Arc, Mutex as StdMutex, PoisonError},
    time::Duration,
};

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    api::MissionReporter,
    models::{
        CompletionReport, FailureReport, MissionSpec, ReportStatus, SessionOutcome, SessionSnapshot,
    },
    notification::{
        mission_complete_body, NotificationPermission, Notifier, MISSION_COMPLETE_TITLE,
    },
    visibility::VisibilitySignal,
};

use super::state::{CancelOutcome, CompletionAck, SessionState, TickOutcome, VisibilityOutcome};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "payload")]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    Heartbeat(SessionSnapshot),
    Completed(SessionSnapshot),
    Ended(SessionOutcome),
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub tick_interval: Duration,
    pub focus_alert_grace: Duration,
    pub heartbeat_every_ticks: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            focus_alert_grace: Duration::from_millis(1500),
            heartbeat_every_ticks: 10,
        }
    }
}

/// Starts mission sessions against a fixed set of collaborators.
#[derive(Clone)]
pub struct MissionController {
    notifier: Arc<dyn Notifier>,
    reporter: Arc<dyn MissionReporter>,
    visibility: VisibilitySignal,
    config: ControllerConfig,
}

impl MissionController {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        reporter: Arc<dyn MissionReporter>,
        visibility: VisibilitySignal,
    ) -> Self {
        Self {
            notifier,
            reporter,
            visibility,
            config: ControllerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub async fn start(&self, mission: MissionSpec) -> Result<SessionHandle> {
        let session_id = Uuid::new_v4().to_string();
        let state = SessionState::begin(session_id.clone(), mission, Utc::now())?;

        if self.notifier.permission() == NotificationPermission::Default {
            let decision = self.notifier.request_permission().await;
            if decision != NotificationPermission::Granted {
                log_warn!("notifications unavailable ({decision:?}); completion will be silent");
            }
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(SessionInner {
            session_id,
            state: Mutex::new(state),
            ticker: StdMutex::new(None),
            scope: CancellationToken::new(),
            outcome: Mutex::new(None),
            notifier: Arc::clone(&self.notifier),
            reporter: Arc::clone(&self.reporter),
            config: self.config.clone(),
            events,
        });

        let snapshot = {
            let state = inner.state.lock().await;
            inner.spawn_ticker(state.ticker_epoch());
            log_info!(
                "session {} started: '{}' for {}s",
                inner.session_id,
                state.mission.display_title(),
                state.total_seconds
            );
            state.snapshot()
        };

        tokio::spawn(visibility_listener(
            Arc::clone(&inner),
            self.visibility.clone(),
            self.visibility.subscribe(),
        ));

        inner.emit(SessionEvent::StateChanged(snapshot));
        Ok(SessionHandle { inner })
    }
}

struct SessionInner {
    session_id: String,
    state: Mutex<SessionState>,
    ticker: StdMutex<Option<JoinHandle<()>>>,
    /// Cancelled on teardown; every background task of the session watches it.
    scope: CancellationToken,
    outcome: Mutex<Option<SessionOutcome>>,
    notifier: Arc<dyn Notifier>,
    reporter: Arc<dyn MissionReporter>,
    config: ControllerConfig,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionInner {
    /// Must be called with the state lock held so that no tick of the
    /// previous ticker can land between retiring it and starting this one.
    fn spawn_ticker(self: &Arc<Self>, epoch: u64) {
        let mut slot = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        if self.scope.is_cancelled() {
            return;
        }
        *slot = Some(tokio::spawn(ticker_loop(Arc::clone(self), epoch)));
    }

    fn cancel_ticker(&self) {
        let mut slot = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn release(&self) {
        self.scope.cancel();
        self.cancel_ticker();
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn on_visibility_change(self: &Arc<Self>, hidden: bool) {
        let snapshot = {
            let mut state = self.state.lock().await;
            match state.on_visibility_change(hidden, Utc::now()) {
                VisibilityOutcome::Unchanged => return,
                VisibilityOutcome::Paused => {
                    self.cancel_ticker();
                    log_info!(
                        "session {} paused at {}s remaining",
                        self.session_id,
                        state.remaining_seconds
                    );
                }
                VisibilityOutcome::Resumed { epoch, alert_token } => {
                    self.spawn_ticker(epoch);
                    self.schedule_alert_clear(alert_token);
                    log_info!(
                        "session {} resumed at {}s remaining",
                        self.session_id,
                        state.remaining_seconds
                    );
                }
            }
            state.snapshot()
        };

        self.emit(SessionEvent::StateChanged(snapshot));
    }

    fn schedule_alert_clear(self: &Arc<Self>, alert_token: u64) {
        let inner = Arc::clone(self);
        let grace = self.config.focus_alert_grace;
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(grace) => {}
                _ = inner.scope.cancelled() => return,
            }

            let snapshot = {
                let mut state = inner.state.lock().await;
                if !state.clear_focus_alert(alert_token) {
                    return;
                }
                state.snapshot()
            };
            inner.emit(SessionEvent::StateChanged(snapshot));
        });
    }

    fn notify_completion(&self, mission_title: &str) {
        let notifier = Arc::clone(&self.notifier);
        let body = mission_complete_body(mission_title);
        // Detached so acknowledging the session cannot cut a delivery short.
        tokio::spawn(async move {
            notifier.notify(MISSION_COMPLETE_TITLE, &body).await;
        });
    }

    async fn cached_outcome(&self) -> Result<SessionOutcome> {
        self.outcome
            .lock()
            .await
            .clone()
            .ok_or_else(|| anyhow!("session {} is still reporting its outcome", self.session_id))
    }

    async fn finish(&self, outcome: SessionOutcome) -> SessionOutcome {
        *self.outcome.lock().await = Some(outcome.clone());
        self.release();
        self.emit(SessionEvent::Ended(outcome.clone()));
        outcome
    }
}

async fn ticker_loop(inner: Arc<SessionInner>, epoch: u64) {
    let period = inner.config.tick_interval;
    // First tick one full period from now: a resumed session starts a fresh second.
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let heartbeat_every = u64::from(inner.config.heartbeat_every_ticks.max(1));

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = inner.scope.cancelled() => break,
        }

        let (outcome, snapshot) = {
            let mut state = inner.state.lock().await;
            let outcome = state.tick_for_epoch(epoch);
            (outcome, state.snapshot())
        };

        match outcome {
            TickOutcome::Ignored => break,
            TickOutcome::Decremented(remaining) => {
                // Counted on served seconds so pauses keep the cadence.
                let served = snapshot.total_seconds.saturating_sub(remaining);
                if served % heartbeat_every == 0 {
                    inner.emit(SessionEvent::Heartbeat(snapshot));
                }
            }
            TickOutcome::Completed => {
                log_info!("session {} reached zero", inner.session_id);
                inner.notify_completion(&snapshot.title);
                inner.emit(SessionEvent::Completed(snapshot));
                break;
            }
        }
    }
}

async fn visibility_listener(
    inner: Arc<SessionInner>,
    signal: VisibilitySignal,
    mut transitions: broadcast::Receiver<bool>,
) {
    loop {
        let hidden = tokio::select! {
            received = transitions.recv() => match received {
                Ok(hidden) => hidden,
                Err(RecvError::Lagged(skipped)) => {
                    log_warn!(
                        "session {} missed {skipped} visibility changes; resyncing",
                        inner.session_id
                    );
                    signal.is_hidden()
                }
                Err(RecvError::Closed) => break,
            },
            _ = inner.scope.cancelled() => break,
        };
        inner.on_visibility_change(hidden).await;
    }
}

/// One running mission. Dropping the handle releases the ticker and the
/// visibility subscription.
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn is_ticking(&self) -> bool {
        self.inner.is_ticking()
    }

    /// Applies a visibility change directly, bypassing the shared signal.
    pub async fn on_visibility_change(&self, hidden: bool) {
        self.inner.on_visibility_change(hidden).await;
    }

    /// The user's acknowledgment of the mission. Reports the completion
    /// once; the local outcome stands even if reporting fails.
    ///
    /// Accepted before the countdown runs out as well: the ticker stops and
    /// the outcome keeps the phase the session had when the call arrived.
    pub async fn complete(&self) -> Result<SessionOutcome> {
        let (report, mut outcome) = {
            let mut state = self.inner.state.lock().await;
            match state.acknowledge_completion(Utc::now()) {
                CompletionAck::Cancelled => bail!("mission was cancelled"),
                CompletionAck::AlreadyAcknowledged => {
                    drop(state);
                    return self.inner.cached_outcome().await;
                }
                CompletionAck::AcknowledgedEarly => log_info!(
                    "session {} acknowledged with {}s remaining",
                    self.inner.session_id,
                    state.remaining_seconds
                ),
                CompletionAck::Acknowledged => {}
            }
            self.inner.cancel_ticker();
            (
                CompletionReport::from_mission(&state.mission),
                draft_outcome(&state),
            )
        };

        outcome.report = match self.inner.reporter.report_complete(&report).await {
            Ok(()) => ReportStatus::Recorded,
            Err(err) => {
                log_error!(
                    "failed to record completion for session {}: {err:#}",
                    self.inner.session_id
                );
                ReportStatus::Failed(format!("{err:#}"))
            }
        };

        Ok(self.inner.finish(outcome).await)
    }

    /// Abandons the mission. A completed mission cannot be cancelled.
    pub async fn cancel(&self) -> Result<SessionOutcome> {
        let (report, mut outcome) = {
            let mut state = self.inner.state.lock().await;
            match state.cancel(Utc::now()) {
                CancelOutcome::AlreadyCompleted => {
                    bail!("mission already completed; acknowledge it instead of cancelling")
                }
                CancelOutcome::AlreadyCancelled => {
                    drop(state);
                    return self.inner.cached_outcome().await;
                }
                CancelOutcome::Cancelled => {}
            }
            self.inner.cancel_ticker();
            log_info!(
                "session {} cancelled with {}s remaining",
                self.inner.session_id,
                state.remaining_seconds
            );
            (FailureReport::from_mission(&state.mission), draft_outcome(&state))
        };

        outcome.report = match self.inner.reporter.report_failure(&report).await {
            Ok(()) => ReportStatus::Recorded,
            Err(err) => {
                log_error!(
                    "failed to record cancellation for session {}: {err:#}",
                    self.inner.session_id
                );
                ReportStatus::Failed(format!("{err:#}"))
            }
        };

        Ok(self.inner.finish(outcome).await)
    }

    /// Releases the ticker and background tasks without reporting anything.
    pub fn dispose(&self) {
        self.inner.release();
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.inner.release();
    }
}

fn draft_outcome(state: &SessionState) -> SessionOutcome {
    let now = Utc::now();
    SessionOutcome {
        session_id: state.session_id.clone(),
        mission: state.mission.clone(),
        phase: state.phase,
        started_at: state.started_at,
        ended_at: state.ended_at.unwrap_or(now),
        focused_seconds: state.focused_seconds(),
        away_ms: state.away_ms(now),
        pause_count: state.pauses.len(),
        report: ReportStatus::Recorded,
    }
}
