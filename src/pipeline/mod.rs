//! Pipeline orchestration: the three-state machine and the controller that
//! drives record -> transcribe -> improve -> deliver cycles.

pub mod controller;
pub mod state;

pub use controller::{ControllerCommand, PipelineController};
pub use state::{PipelineState, SharedState};
