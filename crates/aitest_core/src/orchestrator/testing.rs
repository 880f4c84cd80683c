//! In-memory transport and clock for controller and polling tests.

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::rpc::proto::{StartTestReply, StopTestReply};
use crate::rpc::{AutomationTransport, RpcError, RpcOutcome, RpcResult, SignalValue, TestResult};

use super::polling::Clock;

/// Clock that only advances when slept on.
#[derive(Debug)]
pub struct ManualClock {
    start: DateTime<Utc>,
    now: Cell<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Utc::now(),
            now: Cell::new(Duration::ZERO),
        }
    }

    /// Move time forward without sleeping.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.get()
    }

    fn timestamp(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::milliseconds(self.now.get().as_millis() as i64);
        self.start + offset
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

/// Records every call and answers from a script.
pub struct ScriptedTransport {
    pub calls: Vec<String>,
    pub connect_error: Option<String>,
    pub init: RpcOutcome<()>,
    pub start_testing: RpcOutcome<StartTestReply>,
    pub start_measurement: RpcOutcome<bool>,
    pub load_model: RpcOutcome<bool>,
    pub result: RpcOutcome<TestResult>,
    pub signals: HashMap<String, SignalValue>,
    pub video_config: Option<String>,
    pub model_node_config: Option<(String, i32)>,
    running: VecDeque<RpcOutcome<bool>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            connect_error: None,
            init: RpcOutcome::Success(()),
            start_testing: RpcOutcome::Success(StartTestReply {
                success: true,
                message: String::new(),
            }),
            start_measurement: RpcOutcome::Success(true),
            load_model: RpcOutcome::Success(true),
            result: RpcOutcome::Success(TestResult {
                code: 1,
                additional_code: 0,
                add_to_protocol: true,
            }),
            signals: HashMap::new(),
            video_config: None,
            model_node_config: None,
            running: VecDeque::new(),
        }
    }

    /// Answers for successive `IsRunning` calls; `true` once exhausted.
    pub fn running_sequence(self, values: &[bool]) -> Self {
        self.running_outcomes(values.iter().map(|v| RpcOutcome::Success(*v)).collect())
    }

    pub fn running_outcomes(mut self, outcomes: Vec<RpcOutcome<bool>>) -> Self {
        self.running = outcomes.into();
        self
    }

    pub fn with_signal(mut self, name: &str, value: SignalValue) -> Self {
        self.signals.insert(name.to_string(), value);
        self
    }

    /// How many times `operation` was called.
    pub fn count(&self, operation: &str) -> usize {
        self.calls.iter().filter(|c| c.as_str() == operation).count()
    }

    fn record(&mut self, operation: &str) {
        self.calls.push(operation.to_string());
    }
}

impl AutomationTransport for ScriptedTransport {
    fn connect(&mut self, endpoint: &str, _deadline: Duration) -> RpcResult<()> {
        self.record("Connect");
        match self.connect_error {
            Some(ref message) => Err(RpcError::connection(endpoint, message.clone())),
            None => Ok(()),
        }
    }

    fn init(&mut self) -> RpcOutcome<()> {
        self.record("Init");
        self.init.clone()
    }

    fn modify_video_config(
        &mut self,
        _source_name: &str,
        config: &str,
        _share_with_model: &str,
    ) -> RpcOutcome<()> {
        self.record("ModifyVideoAudioConfig");
        self.video_config = Some(config.to_string());
        RpcOutcome::Success(())
    }

    fn set_video_audio(&mut self, _name: &str, _activate: bool) -> RpcOutcome<bool> {
        self.record("SetVideoAudio");
        RpcOutcome::Success(true)
    }

    fn modify_model_node_config(
        &mut self,
        _model: &str,
        config: &str,
        timeout_secs: i32,
    ) -> RpcOutcome<bool> {
        self.record("ModifyModelNodeConfig");
        self.model_node_config = Some((config.to_string(), timeout_secs));
        RpcOutcome::Success(true)
    }

    fn load_model(&mut self, _model: &str) -> RpcOutcome<bool> {
        self.record("LoadModel");
        self.load_model.clone()
    }

    fn start_testing(&mut self, _model: &str, _config_file: &str) -> RpcOutcome<StartTestReply> {
        self.record("StartTesting");
        self.start_testing.clone()
    }

    fn stop_testing(&mut self) -> RpcOutcome<StopTestReply> {
        self.record("StopTesting");
        RpcOutcome::Success(StopTestReply {
            success: true,
            message: String::new(),
        })
    }

    fn start_measurement(&mut self, _save_to_disk: bool) -> RpcOutcome<bool> {
        self.record("MeasureStart");
        self.start_measurement.clone()
    }

    fn stop_measurement(&mut self) -> RpcOutcome<bool> {
        self.record("MeasureStop");
        RpcOutcome::Success(true)
    }

    fn is_running(&mut self) -> RpcOutcome<bool> {
        self.record("MeasureIsRunning");
        self.running.pop_front().unwrap_or(RpcOutcome::Success(true))
    }

    fn read_signal(&mut self, name: &str, _interpreted: bool) -> RpcOutcome<Option<SignalValue>> {
        self.record("GetSignal");
        match self.signals.get(name) {
            Some(value) => RpcOutcome::Success(Some(value.clone())),
            None => RpcOutcome::Unexpected(format!("unknown signal {}", name)),
        }
    }

    fn get_result(&mut self) -> RpcOutcome<TestResult> {
        self.record("GetResult");
        self.result.clone()
    }

    fn close(&mut self) {
        self.record("Close");
    }
}
