//! Text commands accepted while a session runs in the terminal.

use std::str::FromStr;

use anyhow::{anyhow, Error, Result};

use crate::{
    models::{ReportStatus, SessionOutcome, SessionSnapshot},
    notification::MISSION_FAILED_MESSAGE,
    timer::{format_mmss, SessionHandle},
    visibility::VisibilitySignal,
};

pub const HELP_TEXT: &str = "commands: hide | show | status | done | cancel | help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Simulates the app going to the background.
    Hide,
    Show,
    Status,
    Done,
    Cancel,
    Help,
}

impl FromStr for SessionCommand {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_ascii_lowercase().as_str() {
            "hide" | "away" | "h" => Ok(SessionCommand::Hide),
            "show" | "back" | "v" => Ok(SessionCommand::Show),
            "status" | "s" | "" => Ok(SessionCommand::Status),
            "done" | "complete" | "d" => Ok(SessionCommand::Done),
            "cancel" | "quit" | "q" => Ok(SessionCommand::Cancel),
            "help" | "?" => Ok(SessionCommand::Help),
            other => Err(anyhow!("unknown command '{other}' ({HELP_TEXT})")),
        }
    }
}

#[derive(Debug)]
pub enum CommandReply {
    Message(String),
    Finished(SessionOutcome),
}

pub async fn apply_command(
    handle: &SessionHandle,
    visibility: &VisibilitySignal,
    command: SessionCommand,
) -> Result<CommandReply> {
    let reply = match command {
        SessionCommand::Hide => {
            visibility.set_hidden(true);
            CommandReply::Message("app hidden".into())
        }
        SessionCommand::Show => {
            visibility.set_hidden(false);
            CommandReply::Message("app visible".into())
        }
        SessionCommand::Status => CommandReply::Message(describe_snapshot(&handle.snapshot().await)),
        SessionCommand::Help => CommandReply::Message(HELP_TEXT.into()),
        SessionCommand::Done => match handle.complete().await {
            Ok(outcome) => CommandReply::Finished(outcome),
            Err(err) => CommandReply::Message(err.to_string()),
        },
        SessionCommand::Cancel => match handle.cancel().await {
            Ok(outcome) => CommandReply::Finished(outcome),
            Err(err) => CommandReply::Message(err.to_string()),
        },
    };
    Ok(reply)
}

pub fn describe_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut line = format!(
        "{} | {} | {} left | {:.0}% done",
        snapshot.title,
        snapshot.phase.as_str(),
        snapshot.display,
        snapshot.progress * 100.0
    );
    if snapshot.focus_alert_visible {
        line.push_str(" | focus alert");
    }
    line
}

pub fn describe_outcome(outcome: &SessionOutcome) -> String {
    let headline = if outcome.completed() {
        format!("{} complete!", outcome.mission.display_title())
    } else if outcome.acknowledged_early() {
        format!(
            "{} marked done with {} left.",
            outcome.mission.display_title(),
            format_mmss(outcome.remaining_seconds())
        )
    } else {
        MISSION_FAILED_MESSAGE.to_string()
    };
    let report = match &outcome.report {
        ReportStatus::Recorded => "recorded".to_string(),
        ReportStatus::Failed(reason) => format!("not recorded ({reason})"),
    };
    format!(
        "{headline} focused {} | away {}s over {} pause(s) | {report}",
        format_mmss(outcome.focused_seconds),
        outcome.away_ms / 1000,
        outcome.pause_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MissionSpec, SessionPhase};
    use chrono::Utc;

    #[test]
    fn parses_aliases_and_blank_line() {
        assert_eq!("  HIDE ".parse::<SessionCommand>().unwrap(), SessionCommand::Hide);
        assert_eq!("back".parse::<SessionCommand>().unwrap(), SessionCommand::Show);
        assert_eq!("".parse::<SessionCommand>().unwrap(), SessionCommand::Status);
        assert_eq!("q".parse::<SessionCommand>().unwrap(), SessionCommand::Cancel);
        assert!("pause".parse::<SessionCommand>().is_err());
    }

    #[test]
    fn snapshot_line_mentions_alert() {
        let snapshot = SessionSnapshot {
            session_id: "s".into(),
            title: "Walk".into(),
            phase: SessionPhase::Paused,
            total_seconds: 300,
            remaining_seconds: 290,
            display: "04:50".into(),
            progress: 10.0 / 300.0,
            focus_alert_visible: true,
        };
        assert_eq!(
            describe_snapshot(&snapshot),
            "Walk | Paused | 04:50 left | 3% done | focus alert"
        );
    }

    #[test]
    fn outcome_line_reports_failed_recording() {
        let now = Utc::now();
        let outcome = SessionOutcome {
            session_id: "s".into(),
            mission: MissionSpec::new(1, 1).with_title("Stretch"),
            phase: SessionPhase::Completed,
            started_at: now,
            ended_at: now,
            focused_seconds: 60,
            away_ms: 2_500,
            pause_count: 1,
            report: ReportStatus::Failed("HTTP 500".into()),
        };
        assert_eq!(
            describe_outcome(&outcome),
            "Stretch complete! focused 01:00 | away 2s over 1 pause(s) | not recorded (HTTP 500)"
        );
    }

    #[test]
    fn outcome_line_for_early_done_shows_time_left() {
        let now = Utc::now();
        let outcome = SessionOutcome {
            session_id: "s".into(),
            mission: MissionSpec::new(1, 5).with_title("Read"),
            phase: SessionPhase::Running,
            started_at: now,
            ended_at: now,
            focused_seconds: 10,
            away_ms: 0,
            pause_count: 0,
            report: ReportStatus::Recorded,
        };
        assert_eq!(
            describe_outcome(&outcome),
            "Read marked done with 04:50 left. focused 00:10 | away 0s over 0 pause(s) | recorded"
        );
    }
}
