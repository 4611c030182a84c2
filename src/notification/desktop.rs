use std::{
    process::Output,
    sync::{Mutex, PoisonError},
};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::{NotificationPermission, Notifier};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// OS-level notifications through the platform's command line helper.
pub struct DesktopNotifier {
    enabled: bool,
    permission: Mutex<NotificationPermission>,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            permission: Mutex::new(NotificationPermission::Default),
        }
    }

    async fn deliver(&self, title: &str, body: &str) -> Result<()> {
        #[cfg(target_os = "macos")]
        let (program, mut command) = {
            let script = format!(
                r#"display notification "{}" with title "{}""#,
                body.replace('"', r#"\""#).replace('\n', " "),
                title.replace('"', r#"\""#)
            );
            let mut command = Command::new("osascript");
            command.args(["-e", &script]);
            ("osascript", command)
        };

        #[cfg(not(target_os = "macos"))]
        let (program, mut command) = {
            let mut command = Command::new("notify-send");
            command.args([title, body]);
            ("notify-send", command)
        };

        let output = command
            .output()
            .await
            .with_context(|| format!("failed to launch {program}"))?;
        check_exit(program, &output)
    }
}

fn check_exit(program: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    bail!("{program} exited with {}: {}", output.status, stderr.trim())
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        *self
            .permission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn request_permission(&self) -> NotificationPermission {
        let mut guard = self
            .permission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *guard == NotificationPermission::Default {
            *guard = if self.enabled {
                NotificationPermission::Granted
            } else {
                NotificationPermission::Denied
            };
            log_info!("notification permission resolved to {:?}", *guard);
        }
        *guard
    }

    async fn notify(&self, title: &str, body: &str) {
        if self.permission() != NotificationPermission::Granted {
            return;
        }

        match self.deliver(title, body).await {
            Ok(()) => log_debug!("delivered notification '{title}'"),
            Err(err) => log_warn!("failed to deliver desktop notification: {err:#}"),
        }
    }
}
