use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stretch of time the app spent in the background during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusPause {
    pub id: String,
    pub session_id: String,
    pub pause_started_at: DateTime<Utc>,
    pub pause_ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl FocusPause {
    pub fn open(session_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            pause_started_at: started_at,
            pause_ended_at: None,
            duration_ms: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.pause_ended_at.is_none()
    }

    pub fn close(&mut self, ended_at: DateTime<Utc>) {
        if !self.is_open() {
            return;
        }
        let elapsed = ended_at
            .signed_duration_since(self.pause_started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.pause_ended_at = Some(ended_at);
        self.duration_ms = Some(elapsed);
    }

    /// Closed pauses report their stored duration; an open one is measured up to `now`.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        match self.duration_ms {
            Some(duration) => duration,
            None => now
                .signed_duration_since(self.pause_started_at)
                .num_milliseconds()
                .max(0) as u64,
        }
    }
}
