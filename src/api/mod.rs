//! REST collaborators: the mission reporting seam used by the controller and
//! the client that talks to the backend.

pub mod client;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CompletionReport, FailureReport};

pub use client::MissionApi;
pub use types::{MedalCounts, MissionRecordView};

/// Records the end of a mission attempt on the server.
#[async_trait]
pub trait MissionReporter: Send + Sync {
    async fn report_complete(&self, report: &CompletionReport) -> Result<()>;

    async fn report_failure(&self, report: &FailureReport) -> Result<()>;
}
