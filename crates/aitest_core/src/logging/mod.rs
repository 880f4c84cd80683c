//! Run logging.
//!
//! Every message goes to the console through `tracing` and, when a log file
//! is configured, to that file with a local timestamp. Workflow steps,
//! launched commands and successes get their own markers so a run log can
//! be skimmed step by step.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use aitest_core::logging::{RunLogger, LogLevel};
//!
//! let logger = Arc::new(RunLogger::new("./logs/automation.log", LogLevel::Info).unwrap());
//! logger.phase("connect");
//! logger.info("Connected to localhost:50051");
//! logger.close();
//! ```

mod run_logger;
mod types;

pub use run_logger::RunLogger;
pub use types::{LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose debug output only drowns the run log.
const NOISY_TARGETS: [&str; 4] = ["h2", "hyper_util", "tower", "tonic"];

/// Install the console subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` applies to everything except
/// the gRPC stack, which is held at warnings. Returns `false` if a global
/// subscriber was already installed.
pub fn init_tracing(level: LogLevel) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn filter_directive(level: LogLevel) -> String {
    let mut directive = match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
    .to_string();
    for target in NOISY_TARGETS {
        directive.push_str(&format!(",{}=warn", target));
    }
    directive
}
