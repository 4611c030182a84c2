use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::timer::ControllerConfig;

pub const ENV_API_URL: &str = "DOPAMINE_BREAKER_API_URL";
pub const ENV_TOKEN: &str = "DOPAMINE_BREAKER_TOKEN";
pub const ENV_DEBUG: &str = "DOPAMINE_BREAKER_DEBUG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    pub enabled: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub notifications: NotificationSettings,
    pub focus_alert_grace_ms: u64,
    pub heartbeat_every_ticks: u32,
    #[serde(skip)]
    pub debug: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000/api".into(),
            auth_token: None,
            notifications: NotificationSettings::default(),
            focus_alert_grace_ms: 1500,
            heartbeat_every_ticks: 10,
            debug: false,
        }
    }
}

impl AppSettings {
    /// Environment wins over the file. `lookup` is `std::env::var` outside tests.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_URL).filter(|url| !url.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.auth_token = Some(token).filter(|token| !token.is_empty());
        }
        self.debug = lookup(ENV_DEBUG)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        self
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            focus_alert_grace: Duration::from_millis(self.focus_alert_grace_ms),
            heartbeat_every_ticks: if self.debug {
                1
            } else {
                self.heartbeat_every_ticks.max(1)
            },
            ..ControllerConfig::default()
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> AppSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// File settings with environment overrides applied.
    pub fn effective(&self) -> AppSettings {
        self.settings()
            .with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn update(&self, settings: AppSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
