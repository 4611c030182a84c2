//! Mission definitions as served by the presets endpoint, plus the payloads
//! sent back when a mission finishes or is abandoned.

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};

/// Label used when a mission carries neither a title nor a description.
pub const FALLBACK_MISSION_TITLE: &str = "Mission";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bronze" => Ok(Tier::Bronze),
            "silver" => Ok(Tier::Silver),
            "gold" => Ok(Tier::Gold),
            other => Err(anyhow!(
                "invalid tier '{other}', expected bronze, silver or gold"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionSpec {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl MissionSpec {
    pub fn new(id: i64, duration_minutes: u32) -> Self {
        Self {
            id,
            title: None,
            description: None,
            duration_minutes,
            tier: None,
            category: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Title, then description, then the generic label.
    pub fn display_title(&self) -> &str {
        self.reported_title().unwrap_or(FALLBACK_MISSION_TITLE)
    }

    pub fn total_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    // Blank strings count as missing, same as the web client did.
    fn reported_title(&self) -> Option<&str> {
        non_blank(self.title.as_deref()).or_else(|| non_blank(self.description.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

/// Body of `POST /missions/presets/complete`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionReport {
    pub preset_mission_id: i64,
    pub tier: Option<Tier>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: u32,
}

impl CompletionReport {
    pub fn from_mission(mission: &MissionSpec) -> Self {
        Self {
            preset_mission_id: mission.id,
            tier: mission.tier,
            title: mission.reported_title().map(str::to_owned),
            description: mission.description.clone(),
            duration: mission.duration_minutes,
        }
    }
}

/// Body of `POST /missions/presets/fail`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureReport {
    pub preset_mission_id: i64,
    pub tier: Option<Tier>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl FailureReport {
    pub fn from_mission(mission: &MissionSpec) -> Self {
        Self {
            preset_mission_id: mission.id,
            tier: mission.tier,
            title: mission.reported_title().map(str::to_owned),
            description: mission.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_title_falls_back_to_description_then_label() {
        let titled = MissionSpec::new(1, 5)
            .with_title("Read a chapter")
            .with_description("Any book");
        assert_eq!(titled.display_title(), "Read a chapter");

        let described = MissionSpec::new(2, 5).with_description("Stretch for five minutes");
        assert_eq!(described.display_title(), "Stretch for five minutes");

        let blank = MissionSpec::new(3, 5).with_title("   ");
        assert_eq!(blank.display_title(), FALLBACK_MISSION_TITLE);
    }

    #[test]
    fn preset_payload_deserializes_from_wire_shape() {
        let raw = r#"{"id": 6, "title": "Walk", "description": "Outside, no phone",
            "duration": 20, "tier": "silver", "category": "ai_generated"}"#;
        let mission: MissionSpec = serde_json::from_str(raw).unwrap();

        assert_eq!(mission.id, 6);
        assert_eq!(mission.duration_minutes, 20);
        assert_eq!(mission.tier, Some(Tier::Silver));
        assert_eq!(mission.total_seconds(), 1200);
    }

    #[test]
    fn completion_report_uses_description_when_title_missing() {
        let mission = MissionSpec::new(4, 10)
            .with_description("Tidy the desk")
            .with_tier(Tier::Bronze);
        let report = CompletionReport::from_mission(&mission);

        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["preset_mission_id"], 4);
        assert_eq!(body["tier"], "bronze");
        assert_eq!(body["title"], "Tidy the desk");
        assert_eq!(body["duration"], 10);
    }

    #[test]
    fn failure_report_has_no_duration() {
        let mission = MissionSpec::new(9, 30).with_title("Meditate");
        let body = serde_json::to_value(FailureReport::from_mission(&mission)).unwrap();

        assert!(body.get("duration").is_none());
        assert_eq!(body["title"], "Meditate");
        assert!(body["tier"].is_null());
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!("GOLD".parse::<Tier>().unwrap(), Tier::Gold);
        assert!("all".parse::<Tier>().is_err());
    }
}
