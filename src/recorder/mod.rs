pub mod commands;
pub mod confirm;
pub mod controller;
pub mod deletion;
pub mod state;

pub use confirm::ConfirmOutcome;
pub use controller::{RecorderController, RecorderOptions, RecorderServices, RecorderSnapshot};
pub use deletion::{delete_location, ConfirmPrompt, DeleteDeps, DeleteOutcome, FixedAnswer};
pub use state::{view_only_from_query, ModeController, RecorderMode, RecorderState};
