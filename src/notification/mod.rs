//! Notification capability consumed by the session controller.
//!
//! The controller only ever talks to the [`Notifier`] trait; the desktop
//! implementation lives in [`desktop`].

pub mod desktop;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use desktop::DesktopNotifier;

pub const MISSION_COMPLETE_TITLE: &str = "Mission complete!";
pub const MISSION_FAILED_MESSAGE: &str = "The mission was not completed.";
pub const FOCUS_ALERT_TITLE: &str = "Focus mode is on!";
pub const FOCUS_ALERT_BODY: &str = "Come back to the app to keep the timer going.";

pub fn mission_complete_body(mission_title: &str) -> String {
    format!("{mission_title} mission completed!")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationPermission {
    /// The user has not been asked yet.
    Default,
    Granted,
    Denied,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn permission(&self) -> NotificationPermission;

    /// Asks for permission once. Calling it after a decision was made returns that decision.
    async fn request_permission(&self) -> NotificationPermission;

    /// Delivers a notification. Does nothing unless permission was granted.
    async fn notify(&self, title: &str, body: &str);
}
