//! Shared types for the automation workflow.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rpc::{SignalValue, TestResult};

/// Handle for interrupting a running workflow.
///
/// The controller checks it at every step boundary and on every poll.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create an untriggered handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One snapshot of the monitored signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    /// When the snapshot was started (UTC).
    pub timestamp: DateTime<Utc>,
    /// Values in configured signal order; `None` marks a failed read.
    pub values: Vec<(String, Option<SignalValue>)>,
}

impl SignalSample {
    /// Value of `signal`, if it was read successfully.
    pub fn get(&self, signal: &str) -> Option<&SignalValue> {
        self.values
            .iter()
            .find(|(name, _)| name == signal)
            .and_then(|(_, value)| value.as_ref())
    }
}

/// A way of starting and stopping the measurement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartStrategy {
    /// `TestAutomationService.StartTesting` / `StopTesting`.
    TestingService,
    /// `Measure.Start` / `Measure.Stop`.
    Measure,
}

impl StartStrategy {
    /// Strategies tried when none are configured, in order.
    pub fn default_order() -> Vec<StartStrategy> {
        vec![StartStrategy::TestingService, StartStrategy::Measure]
    }

    /// RPC used to start.
    pub fn start_operation(&self) -> &'static str {
        match self {
            StartStrategy::TestingService => "StartTesting",
            StartStrategy::Measure => "MeasureStart",
        }
    }

    /// RPC used to stop.
    pub fn stop_operation(&self) -> &'static str {
        match self {
            StartStrategy::TestingService => "StopTesting",
            StartStrategy::Measure => "MeasureStop",
        }
    }
}

impl fmt::Display for StartStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartStrategy::TestingService => write!(f, "testing-service"),
            StartStrategy::Measure => write!(f, "measure"),
        }
    }
}

/// Options for a full run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Do not launch the automation server.
    pub skip_helper_launch: bool,
    /// Do not launch the model host executable.
    pub skip_model_host_launch: bool,
    /// Stop polling after this long; `None` or zero polls until the
    /// measurement ends.
    pub max_duration: Option<Duration>,
    /// Delay between polls. Default 0.5 s.
    pub poll_interval: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            skip_helper_launch: false,
            skip_model_host_launch: false,
            max_duration: None,
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub model_name: String,
    pub endpoint: String,
    pub strategy: StartStrategy,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub samples: Vec<SignalSample>,
    pub result: TestResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_handle_is_shared() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_cancelled());

        handle.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn sample_lookup_skips_failed_reads() {
        let sample = SignalSample {
            timestamp: Utc::now(),
            values: vec![
                ("A".to_string(), Some(SignalValue::Int(1))),
                ("B".to_string(), None),
            ],
        };
        assert_eq!(sample.get("A"), Some(&SignalValue::Int(1)));
        assert_eq!(sample.get("B"), None);
        assert_eq!(sample.get("C"), None);
    }

    #[test]
    fn strategies_pair_start_and_stop() {
        let order = StartStrategy::default_order();
        assert_eq!(order[0].stop_operation(), "StopTesting");
        assert_eq!(order[1].start_operation(), "MeasureStart");
    }
}
