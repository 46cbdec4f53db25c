pub mod controller;
pub mod state;

pub use controller::{ExportController, ExportError};
pub use state::ExportState;
