//! Automation workflow orchestration.
//!
//! The controller walks the remote server through a fixed sequence of
//! states, polling signals while the measurement runs.
//!
//! # Architecture
//!
//! ```text
//! Controller
//!     ├── launch_helper        (Idle)
//!     ├── connect              Idle → Connected
//!     ├── launch_model_host    (Connected)
//!     ├── configure_video      Connected → VideoConfigured
//!     ├── configure_model_host VideoConfigured → ModelHostConfigured
//!     ├── load_model           ModelHostConfigured → ModelLoaded
//!     ├── start_measurement    ModelLoaded → Measuring
//!     ├── wait_for_completion  (Measuring, SignalPoller)
//!     ├── stop_measurement     Measuring → Stopped
//!     └── fetch_result         Stopped → ResultFetched
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use aitest_core::config;
//! use aitest_core::logging::{LogLevel, RunLogger};
//! use aitest_core::orchestrator::{CancelHandle, Controller, RunOptions};
//! use aitest_core::rpc::RpcClient;
//!
//! let cfg = config::load("config.yaml").unwrap();
//! let logger = Arc::new(RunLogger::new(&cfg.logging.file, LogLevel::Info).unwrap());
//! let client = RpcClient::new(Arc::clone(&logger), cfg.rpc_timeout()).unwrap();
//! let mut controller = Controller::new(cfg, logger, client, CancelHandle::new());
//! let report = controller.run(&RunOptions::default()).unwrap();
//! println!("Collected {} samples", report.samples.len());
//! ```

mod controller;
mod errors;
mod polling;
mod state;
#[cfg(test)]
mod testing;
mod types;

pub use controller::{Controller, DEFAULT_HELPER_SETTLE};
pub use errors::{WorkflowError, WorkflowResult};
pub use polling::{Clock, SignalPoller, SystemClock};
pub use state::WorkflowState;
pub use types::{CancelHandle, RunOptions, RunReport, SignalSample, StartStrategy};
