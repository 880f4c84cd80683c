//! Signal polling while a measurement runs.
//!
//! Each iteration reads every configured signal, records a sample, then asks
//! the server whether the measurement is still running. Polling ends when it
//! is not, when the maximum duration has elapsed, or when the run is
//! cancelled.

use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::logging::RunLogger;
use crate::rpc::{AutomationTransport, RpcOutcome};

use super::errors::{WorkflowError, WorkflowResult};
use super::types::{CancelHandle, SignalSample};

const STEP: &str = "wait_for_completion";

/// Source of time for the polling loop.
pub trait Clock {
    /// Monotonic time since an arbitrary origin.
    fn elapsed(&self) -> Duration;

    /// Wall-clock time for sample timestamps.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Block for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Polls signals until the measurement ends.
pub struct SignalPoller<'a, C: Clock> {
    clock: &'a C,
    logger: &'a RunLogger,
    cancel: &'a CancelHandle,
    signals: &'a [String],
    max_duration: Option<Duration>,
    poll_interval: Duration,
}

impl<'a, C: Clock> SignalPoller<'a, C> {
    pub fn new(
        clock: &'a C,
        logger: &'a RunLogger,
        cancel: &'a CancelHandle,
        signals: &'a [String],
    ) -> Self {
        Self {
            clock,
            logger,
            cancel,
            signals,
            max_duration: None,
            poll_interval: Duration::from_millis(500),
        }
    }

    /// Stop after `max_duration`; `None` or zero disables the limit.
    pub fn max_duration(mut self, max_duration: Option<Duration>) -> Self {
        self.max_duration = max_duration.filter(|d| !d.is_zero());
        self
    }

    /// Delay between iterations.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run the loop, returning samples in chronological order.
    pub fn run<T: AutomationTransport>(
        &self,
        transport: &mut T,
    ) -> WorkflowResult<Vec<SignalSample>> {
        self.logger
            .info(&format!("Monitoring {} signals", self.signals.len()));
        let started = self.clock.elapsed();
        let mut samples = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                self.logger.warn("Signal monitoring interrupted");
                return Err(WorkflowError::interrupted(STEP));
            }

            samples.push(self.sample(transport));

            let running = transport
                .is_running()
                .into_result("MeasureIsRunning")
                .map_err(|e| WorkflowError::rpc(STEP, e))?;
            if !running {
                self.logger.info("Measurement reported as finished");
                break;
            }

            if let Some(limit) = self.max_duration {
                if self.clock.elapsed().saturating_sub(started) >= limit {
                    self.logger.warn(&format!(
                        "Maximum monitoring duration reached ({}s)",
                        limit.as_secs_f64()
                    ));
                    break;
                }
            }

            self.clock.sleep(self.poll_interval);
        }

        self.logger
            .info(&format!("Collected {} samples", samples.len()));
        Ok(samples)
    }

    fn sample<T: AutomationTransport>(&self, transport: &mut T) -> SignalSample {
        let timestamp = self.clock.timestamp();
        let values = self
            .signals
            .iter()
            .map(|name| {
                let value = match transport.read_signal(name, true) {
                    RpcOutcome::Success(Some(value)) => Some(value),
                    RpcOutcome::Success(None) => {
                        self.logger
                            .warn(&format!("Signal {} returned no value", name));
                        None
                    }
                    failure => {
                        let detail = failure.failure_detail().unwrap_or_default();
                        self.logger
                            .warn(&format!("Failed to read signal {}: {}", name, detail));
                        None
                    }
                };
                (name.clone(), value)
            })
            .collect();

        SignalSample { timestamp, values }
    }
}
