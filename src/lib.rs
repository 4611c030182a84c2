pub mod api;
pub mod models;
pub mod notification;
pub mod settings;
pub mod timer;
pub mod utils;
pub mod visibility;

use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

use api::MissionApi;
use models::{MissionSpec, Tier};
use notification::{DesktopNotifier, FOCUS_ALERT_BODY, FOCUS_ALERT_TITLE};
use settings::SettingsStore;
use timer::{
    commands::{apply_command, describe_outcome, describe_snapshot, CommandReply, SessionCommand, HELP_TEXT},
    MissionController, SessionEvent,
};
use visibility::VisibilitySignal;

/// Identifier used for missions started from the command line rather than a preset.
const AD_HOC_MISSION_ID: i64 = 0;

#[derive(Debug, Parser)]
#[command(name = "dopamine-breaker", version, about = "Timed focus missions with tiered medals")]
struct Cli {
    /// Settings file (JSON). Created on first save.
    #[arg(
        long,
        env = "DOPAMINE_BREAKER_SETTINGS",
        default_value = "dopamine-breaker.json"
    )]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List today's preset missions.
    Presets,
    /// Show earned medal counts.
    Medals,
    /// Show recently completed missions.
    Recent {
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
    /// Show completed missions of one tier.
    ByTier { tier: Tier },
    /// Run a mission timer in this terminal.
    Start {
        /// Start one of today's presets by id.
        #[arg(long, conflicts_with = "minutes")]
        preset: Option<i64>,
        #[arg(long, required_unless_present = "preset")]
        minutes: Option<u32>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        tier: Option<Tier>,
    },
}

pub async fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let store = SettingsStore::new(cli.settings.clone())?;
    let settings = store.effective();
    log::info!(
        "using API {} (settings: {})",
        settings.api_base_url,
        store.path().display()
    );

    let api = MissionApi::new(settings.api_base_url.clone(), settings.auth_token.clone())?;

    match cli.command {
        Command::Presets => {
            for mission in api.presets().await? {
                println!("{}", describe_mission(&mission));
            }
        }
        Command::Medals => {
            let medals = api.medals().await?;
            println!(
                "{}: {} | {}: {} | {}: {} | total {}",
                Tier::Bronze.label(),
                medals.bronze,
                Tier::Silver.label(),
                medals.silver,
                Tier::Gold.label(),
                medals.gold,
                medals.total()
            );
        }
        Command::Recent { limit } => {
            for record in api.recent(limit).await? {
                println!(
                    "{} | {} | {} | {} min | {}",
                    record.completed_at.as_deref().unwrap_or("-"),
                    if record.is_completed() { "done" } else { "failed" },
                    record.tier.as_deref().unwrap_or("-"),
                    record.actual_duration.unwrap_or(0),
                    record.title.as_deref().unwrap_or("-")
                );
            }
        }
        Command::ByTier { tier } => {
            let records = api.by_tier(tier).await?;
            let earned = records.iter().filter(|record| record.is_completed()).count();
            println!("{} medals: {earned}", tier.label());
            for record in records.iter().filter(|record| record.is_completed()) {
                println!("  {}", record.title.as_deref().unwrap_or("-"));
            }
        }
        Command::Start {
            preset,
            minutes,
            title,
            description,
            tier,
        } => {
            let mission = match preset {
                Some(id) => api
                    .presets()
                    .await?
                    .into_iter()
                    .find(|mission| mission.id == id)
                    .ok_or_else(|| anyhow!("no preset mission with id {id} is available today"))?,
                None => {
                    let minutes = minutes.context("--minutes is required without --preset")?;
                    MissionSpec {
                        title,
                        description,
                        tier,
                        ..MissionSpec::new(AD_HOC_MISSION_ID, minutes)
                    }
                }
            };

            let visibility = VisibilitySignal::new();
            let controller = MissionController::new(
                Arc::new(DesktopNotifier::new(settings.notifications.enabled)),
                Arc::new(api),
                visibility.clone(),
            )
            .with_config(settings.controller_config());

            run_session(&controller, &visibility, mission).await?;
        }
    }

    Ok(())
}

async fn run_session(
    controller: &MissionController,
    visibility: &VisibilitySignal,
    mission: MissionSpec,
) -> Result<()> {
    let handle = controller.start(mission).await?;
    let mut events = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut alert_shown = false;

    println!("{}", describe_snapshot(&handle.snapshot().await));
    println!("{HELP_TEXT}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    // stdin closed: tear down without reporting.
                    handle.dispose();
                    bail!("input closed before the mission ended");
                };
                let command = match line.parse::<SessionCommand>() {
                    Ok(command) => command,
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                };
                match apply_command(&handle, visibility, command).await? {
                    CommandReply::Message(message) => println!("{message}"),
                    CommandReply::Finished(outcome) => {
                        println!("{}", describe_outcome(&outcome));
                        return Ok(());
                    }
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Heartbeat(snapshot)) => println!("{}", describe_snapshot(&snapshot)),
                Ok(SessionEvent::StateChanged(snapshot)) => {
                    if snapshot.focus_alert_visible && !alert_shown {
                        println!("{FOCUS_ALERT_TITLE} {FOCUS_ALERT_BODY}");
                    }
                    alert_shown = snapshot.focus_alert_visible;
                    println!("{}", describe_snapshot(&snapshot));
                }
                Ok(SessionEvent::Completed(snapshot)) => {
                    println!("{} finished! type `done` to record it", snapshot.title);
                }
                Ok(SessionEvent::Ended(_)) => {}
                Err(RecvError::Lagged(skipped)) => log::warn!("skipped {skipped} session events"),
                Err(RecvError::Closed) => return Ok(()),
            }
        }
    }
}

fn describe_mission(mission: &MissionSpec) -> String {
    format!(
        "#{:<3} {:<7} {:>3} min  {}",
        mission.id,
        mission.tier.map(|tier| tier.label()).unwrap_or("-"),
        mission.duration_minutes,
        mission.display_title()
    )
}
