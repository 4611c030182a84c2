pub mod mission;
pub mod pause;
pub mod session;

pub use mission::{CompletionReport, FailureReport, MissionSpec, Tier};
pub use pause::FocusPause;
pub use session::{ReportStatus, SessionOutcome, SessionPhase, SessionSnapshot};
