//! External process lifecycle.
//!
//! Launches the automation server and the model host executable, and stops
//! them with an escalating signal sequence when the run ends.

mod errors;
mod manager;

pub use errors::{ProcessError, ProcessResult};
pub use manager::{ProcessHandle, ProcessManager, TerminationPolicy, TerminationStage};
