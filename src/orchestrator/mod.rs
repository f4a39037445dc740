//! Submission orchestration.
//!
//! The controller owns the execution record list and the per-execution poll
//! tasks. Presentation layers drive it with commands and render the events it
//! emits back.

mod controller;

pub(crate) use controller::{run_controller, ControllerCommand};
