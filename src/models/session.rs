use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MissionSpec;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Running,
    Paused,
    Completed,
    Cancelled,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Running => "Running",
            SessionPhase::Paused => "Paused",
            SessionPhase::Completed => "Completed",
            SessionPhase::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Cancelled)
    }
}

/// Point-in-time view of a session, suitable for rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub title: String,
    pub phase: SessionPhase,
    pub total_seconds: u64,
    pub remaining_seconds: u64,
    pub display: String,
    pub progress: f64,
    pub focus_alert_visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "status", content = "reason")]
pub enum ReportStatus {
    Recorded,
    Failed(String),
}

impl ReportStatus {
    pub fn is_recorded(&self) -> bool {
        matches!(self, ReportStatus::Recorded)
    }
}

/// What the user gets back once a session ends, whether or not the server heard about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub session_id: String,
    pub mission: MissionSpec,
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub focused_seconds: u64,
    pub away_ms: u64,
    pub pause_count: usize,
    pub report: ReportStatus,
}

impl SessionOutcome {
    pub fn completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    /// Marked done by the user before the countdown reached zero.
    pub fn acknowledged_early(&self) -> bool {
        !self.phase.is_terminal()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.mission
            .total_seconds()
            .saturating_sub(self.focused_seconds)
    }
}
