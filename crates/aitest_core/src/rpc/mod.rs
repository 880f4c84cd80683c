//! Remote procedure calls to the automation server.
//!
//! This module provides:
//! - Message definitions for the `testautomation` package
//! - [`RpcOutcome`], the tagged result of one call
//! - [`AutomationTransport`], the seam the controller drives
//! - [`RpcClient`], the tonic-backed implementation

mod client;
mod errors;
mod outcome;
pub mod proto;
mod transport;
mod types;

pub use client::RpcClient;
pub use errors::{RpcError, RpcResult};
pub use outcome::RpcOutcome;
pub use transport::AutomationTransport;
pub use types::{SignalValue, TestResult};
