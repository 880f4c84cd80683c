//! AI Test Core - Orchestration of remote AI model test runs
//!
//! This crate drives an automation server over gRPC: it launches the helper
//! processes, configures the video source and model, runs the measurement,
//! polls signals, and exports the collected results. It has no CLI
//! dependencies and can be embedded in other front ends.

pub mod compare;
pub mod config;
pub mod export;
pub mod logging;
pub mod orchestrator;
pub mod process;
pub mod rpc;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
