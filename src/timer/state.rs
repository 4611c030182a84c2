use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use crate::models::{FocusPause, MissionSpec, SessionPhase, SessionSnapshot};

/// Renders whole seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_mmss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Fraction of the mission already served, always within `[0, 1]`.
pub fn progress_ratio(total_seconds: u64, remaining_seconds: u64) -> f64 {
    if total_seconds == 0 {
        return 0.0;
    }
    let served = total_seconds.saturating_sub(remaining_seconds);
    (served as f64 / total_seconds as f64).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running, or the tick came from a retired ticker.
    Ignored,
    Decremented(u64),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityOutcome {
    Unchanged,
    Paused,
    /// The caller must start a ticker for `epoch` and clear the alert for
    /// `alert_token` once the grace window has passed.
    Resumed { epoch: u64, alert_token: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyCancelled,
    AlreadyCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAck {
    Acknowledged,
    /// Acknowledged while the countdown was still running or paused. The
    /// phase is left as it was; the session is settled all the same.
    AcknowledgedEarly,
    AlreadyAcknowledged,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub mission: MissionSpec,
    pub phase: SessionPhase,
    pub total_seconds: u64,
    pub remaining_seconds: u64,
    pub focus_alert_visible: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub pauses: Vec<FocusPause>,
    completion_acknowledged: bool,
    /// Bumped whenever the running window ends or starts; a ticker only
    /// applies decrements while its epoch is current.
    ticker_epoch: u64,
    alert_token: u64,
}

impl SessionState {
    pub fn begin(
        session_id: String,
        mission: MissionSpec,
        started_at: DateTime<Utc>,
    ) -> Result<Self> {
        if mission.duration_minutes == 0 {
            bail!(
                "mission {} has a non-positive duration; durationMinutes must be greater than zero",
                mission.id
            );
        }

        let total_seconds = mission.total_seconds();
        Ok(Self {
            session_id,
            mission,
            phase: SessionPhase::Running,
            total_seconds,
            remaining_seconds: total_seconds,
            focus_alert_visible: false,
            started_at,
            ended_at: None,
            pauses: Vec::new(),
            completion_acknowledged: false,
            ticker_epoch: 1,
            alert_token: 0,
        })
    }

    pub fn ticker_epoch(&self) -> u64 {
        self.ticker_epoch
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != SessionPhase::Running || self.completion_acknowledged {
            return TickOutcome::Ignored;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Decremented(self.remaining_seconds);
        }

        self.phase = SessionPhase::Completed;
        self.ended_at = Some(Utc::now());
        self.ticker_epoch += 1;
        TickOutcome::Completed
    }

    /// Same as [`tick`](Self::tick), but only for the ticker that owns the current epoch.
    pub fn tick_for_epoch(&mut self, epoch: u64) -> TickOutcome {
        if epoch != self.ticker_epoch {
            return TickOutcome::Ignored;
        }
        self.tick()
    }

    pub fn on_visibility_change(&mut self, hidden: bool, at: DateTime<Utc>) -> VisibilityOutcome {
        if self.completion_acknowledged {
            return VisibilityOutcome::Unchanged;
        }
        match (hidden, self.phase) {
            (true, SessionPhase::Running) => {
                self.phase = SessionPhase::Paused;
                self.ticker_epoch += 1;
                self.raise_focus_alert();
                self.pauses.push(FocusPause::open(&self.session_id, at));
                VisibilityOutcome::Paused
            }
            (false, SessionPhase::Paused) => {
                self.phase = SessionPhase::Running;
                self.ticker_epoch += 1;
                let alert_token = self.raise_focus_alert();
                self.close_open_pause(at);
                VisibilityOutcome::Resumed {
                    epoch: self.ticker_epoch,
                    alert_token,
                }
            }
            _ => VisibilityOutcome::Unchanged,
        }
    }

    /// Hides the alert unless a newer one was raised after `token` was issued.
    pub fn clear_focus_alert(&mut self, token: u64) -> bool {
        if token != self.alert_token || !self.focus_alert_visible {
            return false;
        }
        self.focus_alert_visible = false;
        true
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> CancelOutcome {
        if self.completion_acknowledged {
            return CancelOutcome::AlreadyCompleted;
        }
        match self.phase {
            SessionPhase::Completed => CancelOutcome::AlreadyCompleted,
            SessionPhase::Cancelled => CancelOutcome::AlreadyCancelled,
            SessionPhase::Running | SessionPhase::Paused => {
                self.phase = SessionPhase::Cancelled;
                self.ticker_epoch += 1;
                self.focus_alert_visible = false;
                self.close_open_pause(at);
                self.ended_at = Some(at);
                CancelOutcome::Cancelled
            }
        }
    }

    pub fn acknowledge_completion(&mut self, at: DateTime<Utc>) -> CompletionAck {
        if self.completion_acknowledged {
            return CompletionAck::AlreadyAcknowledged;
        }
        match self.phase {
            SessionPhase::Cancelled => CompletionAck::Cancelled,
            SessionPhase::Completed => {
                self.completion_acknowledged = true;
                self.focus_alert_visible = false;
                CompletionAck::Acknowledged
            }
            SessionPhase::Running | SessionPhase::Paused => {
                self.completion_acknowledged = true;
                self.ticker_epoch += 1;
                self.focus_alert_visible = false;
                self.close_open_pause(at);
                self.ended_at = Some(at);
                CompletionAck::AcknowledgedEarly
            }
        }
    }

    pub fn focused_seconds(&self) -> u64 {
        self.total_seconds.saturating_sub(self.remaining_seconds)
    }

    pub fn away_ms(&self, now: DateTime<Utc>) -> u64 {
        self.pauses.iter().map(|pause| pause.elapsed_ms(now)).sum()
    }

    pub fn progress(&self) -> f64 {
        progress_ratio(self.total_seconds, self.remaining_seconds)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            title: self.mission.display_title().to_string(),
            phase: self.phase,
            total_seconds: self.total_seconds,
            remaining_seconds: self.remaining_seconds,
            display: format_mmss(self.remaining_seconds),
            progress: self.progress(),
            focus_alert_visible: self.focus_alert_visible,
        }
    }

    fn raise_focus_alert(&mut self) -> u64 {
        self.alert_token += 1;
        self.focus_alert_visible = true;
        self.alert_token
    }

    fn close_open_pause(&mut self, at: DateTime<Utc>) {
        if let Some(pause) = self.pauses.last_mut().filter(|pause| pause.is_open()) {
            pause.close(at);
        }
    }
}
