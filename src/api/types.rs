use serde::{Deserialize, Serialize};

use crate::models::MissionSpec;

/// `/missions/presets` answers with either a bare list or `{ "missions": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PresetsResponse {
    List(Vec<MissionSpec>),
    Wrapped {
        #[serde(default)]
        missions: Vec<MissionSpec>,
    },
}

impl PresetsResponse {
    pub(crate) fn into_missions(self) -> Vec<MissionSpec> {
        match self {
            PresetsResponse::List(missions) | PresetsResponse::Wrapped { missions } => missions,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedalCounts {
    #[serde(default)]
    pub bronze: u32,
    #[serde(default)]
    pub silver: u32,
    #[serde(default)]
    pub gold: u32,
}

impl MedalCounts {
    pub fn total(&self) -> u32 {
        self.bronze + self.silver + self.gold
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MedalsResponse {
    #[serde(default)]
    pub medals: MedalCounts,
}

/// A stored attempt as returned by the history endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissionRecordView {
    pub id: i64,
    #[serde(default)]
    pub preset_mission_id: Option<i64>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub actual_duration: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MissionRecordView {
    /// Failed attempts are stored with a zero duration.
    pub fn is_completed(&self) -> bool {
        self.actual_duration.unwrap_or(0) > 0
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordsResponse {
    #[serde(default)]
    pub missions: Vec<MissionRecordView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_accept_bare_list_and_wrapped_shapes() {
        let bare = r#"[{"id": 1, "title": "A", "description": "a", "duration": 5, "tier": "bronze"}]"#;
        let wrapped = r#"{"missions": [{"id": 2, "duration": 10, "tier": "gold"}]}"#;
        let empty = r#"{"error": "not generated yet"}"#;

        let bare: PresetsResponse = serde_json::from_str(bare).unwrap();
        assert_eq!(bare.into_missions()[0].id, 1);

        let wrapped: PresetsResponse = serde_json::from_str(wrapped).unwrap();
        assert_eq!(wrapped.into_missions()[0].duration_minutes, 10);

        let empty: PresetsResponse = serde_json::from_str(empty).unwrap();
        assert!(empty.into_missions().is_empty());
    }

    #[test]
    fn medals_and_records_decode() {
        let medals: MedalsResponse =
            serde_json::from_str(r#"{"medals": {"bronze": 3, "silver": 1, "gold": 0}}"#).unwrap();
        assert_eq!(medals.medals.total(), 4);

        let records: RecordsResponse = serde_json::from_str(
            r#"{"missions": [
                {"id": 7, "preset_mission_id": 2, "tier": "silver", "title": "Walk",
                 "completed_at": "2025-11-02T10:00:00", "actual_duration": 20, "notes": null},
                {"id": 8, "preset_mission_id": 3, "actual_duration": 0, "notes": "failed"}
            ]}"#,
        )
        .unwrap();
        assert!(records.missions[0].is_completed());
        assert!(!records.missions[1].is_completed());
    }
}
