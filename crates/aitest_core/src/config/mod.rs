//! Run configuration.
//!
//! This module provides:
//! - A small indentation-based parser for the configuration file format
//! - Typed sections with named defaults and validation
//! - Command-line overrides applied once at startup
//!
//! # Example
//!
//! ```no_run
//! use aitest_core::config::{self, ConfigOverrides};
//!
//! let mut cfg = config::load("config.yaml").unwrap();
//! ConfigOverrides {
//!     port: Some(50052),
//!     ..Default::default()
//! }
//! .apply(&mut cfg);
//! println!("Connecting to {}", cfg.connection.endpoint());
//! ```

mod errors;
mod loader;
mod overrides;
mod parser;
mod settings;

pub use errors::{ConfigError, ConfigResult};
pub use loader::{load, load_str};
pub use overrides::ConfigOverrides;
pub use parser::{parse_document, parse_scalar, Value};
pub use settings::{
    expand_home, Configuration, ConnectionSettings, DeviceUnderTestSettings, LoggingSettings,
    TestSettings, VideoMode, VideoSettings, DEFAULT_TIMEOUT_MS, MIN_RPC_TIMEOUT,
    REQUIRED_SECTIONS,
};
