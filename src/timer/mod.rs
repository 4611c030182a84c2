pub mod commands;
pub mod controller;
pub mod state;

pub use controller::{ControllerConfig, MissionController, SessionEvent, SessionHandle};
pub use state::{format_mmss, progress_ratio, SessionState};
