//! The automation workflow state machine.
//!
//! The controller owns the configuration, the transport, every launched
//! process and the current [`WorkflowState`]. Each operation is valid only
//! from its predecessor state; a failing or out-of-order operation moves the
//! workflow to `Failed` and tears it down.
//!
//! Teardown runs exactly once, on failure, on [`Controller::finish`] or when
//! the controller is dropped: it stops a started measurement that was not
//! stopped yet, terminates all processes and closes the connection.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::config::{expand_home, ConfigError, Configuration, VideoMode};
use crate::logging::RunLogger;
use crate::process::ProcessManager;
use crate::rpc::{AutomationTransport, RpcError, RpcOutcome, TestResult};

use super::errors::{WorkflowError, WorkflowResult};
use super::polling::{Clock, SignalPoller, SystemClock};
use super::state::WorkflowState;
use super::types::{CancelHandle, RunOptions, RunReport, SignalSample, StartStrategy};

/// Time the automation server is given to start listening.
pub const DEFAULT_HELPER_SETTLE: Duration = Duration::from_secs(5);

/// Drives one automation run.
pub struct Controller<T: AutomationTransport, C: Clock = SystemClock> {
    config: Configuration,
    logger: Arc<RunLogger>,
    transport: T,
    processes: ProcessManager,
    clock: C,
    cancel: CancelHandle,
    state: WorkflowState,
    strategies: Vec<StartStrategy>,
    active_strategy: Option<StartStrategy>,
    stop_attempted: bool,
    connected: bool,
    torn_down: bool,
    helper_settle: Duration,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
}

impl<T: AutomationTransport> Controller<T, SystemClock> {
    /// Create a controller using real time and default process termination.
    pub fn new(
        config: Configuration,
        logger: Arc<RunLogger>,
        transport: T,
        cancel: CancelHandle,
    ) -> Self {
        let processes = ProcessManager::new(Arc::clone(&logger));
        Controller::with_parts(config, logger, transport, processes, SystemClock::new(), cancel)
    }
}

impl<T: AutomationTransport, C: Clock> Controller<T, C> {
    /// Create a controller from explicit collaborators.
    pub fn with_parts(
        config: Configuration,
        logger: Arc<RunLogger>,
        transport: T,
        processes: ProcessManager,
        clock: C,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            config,
            logger,
            transport,
            processes,
            clock,
            cancel,
            state: WorkflowState::Idle,
            strategies: StartStrategy::default_order(),
            active_strategy: None,
            stop_attempted: false,
            connected: false,
            torn_down: false,
            helper_settle: DEFAULT_HELPER_SETTLE,
            started_at: None,
            stopped_at: None,
        }
    }

    /// Replace the ordered list of start strategies.
    pub fn with_strategies(mut self, strategies: Vec<StartStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Change how long to wait after launching the automation server.
    pub fn with_helper_settle(mut self, settle: Duration) -> Self {
        self.helper_settle = settle;
        self
    }

    /// Current workflow state.
    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// The strategy that started the measurement, if it started.
    pub fn active_strategy(&self) -> Option<StartStrategy> {
        self.active_strategy
    }

    /// The run configuration.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of processes still owned by this run.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Launch the automation server in automation mode.
    ///
    /// Valid only before connecting. Returns whether a process was launched;
    /// a launch failure is fatal.
    pub fn launch_helper(&mut self, skip: bool) -> WorkflowResult<bool> {
        const STEP: &str = "launch_helper";
        self.begin(STEP, WorkflowState::Idle)?;

        if skip {
            self.logger.info("Skipping automation server launch as requested");
            return Ok(false);
        }
        let Some(executable) = self.config.test.helper_executable.clone() else {
            self.logger
                .warn("No automation server executable configured; skipping launch");
            return Ok(false);
        };

        let args = vec![
            format!("--grpc-port={}", self.config.connection.port),
            "--automation".to_string(),
        ];
        if let Err(e) = self.processes.start(&executable, &args) {
            return Err(self.fail(WorkflowError::process(STEP, e)));
        }

        self.logger.info("Waiting for automation server to initialise");
        self.clock.sleep(self.helper_settle);
        Ok(true)
    }

    /// Launch the model host executable.
    ///
    /// Valid only once connected. A missing executable or a launch failure
    /// is logged and the run continues without it.
    pub fn launch_model_host(&mut self, skip: bool) -> WorkflowResult<bool> {
        const STEP: &str = "launch_model_host";
        self.begin(STEP, WorkflowState::Connected)?;

        if skip {
            self.logger.info("Skipping model host launch as requested");
            return Ok(false);
        }
        let executable = self.config.device_under_test.executable.clone();
        if executable.as_os_str().is_empty() || !executable.exists() {
            self.logger.warn(&format!(
                "Model host executable not found at {}",
                executable.display()
            ));
            return Ok(false);
        }

        let config_file = &self.config.device_under_test.config_file;
        let args = if config_file.exists() {
            vec![config_file.display().to_string()]
        } else {
            self.logger.warn(&format!(
                "Model host configuration file not found at {}",
                config_file.display()
            ));
            Vec::new()
        };

        match self.processes.start(&executable, &args) {
            Ok(_) => Ok(true),
            Err(e) => {
                self.logger
                    .error(&format!("Failed to launch model host: {}", e));
                Ok(false)
            }
        }
    }

    /// Idle → Connected.
    pub fn connect(&mut self) -> WorkflowResult<()> {
        const STEP: &str = "connect";
        self.transition(STEP, WorkflowState::Idle, |ctl| {
            let endpoint = ctl.config.connection.endpoint();
            let deadline = ctl.config.rpc_timeout();
            ctl.transport
                .connect(&endpoint, deadline)
                .map_err(|e| WorkflowError::rpc(STEP, e))?;
            ctl.connected = true;

            match ctl.transport.init() {
                RpcOutcome::Success(()) => ctl.logger.debug("Application initialised"),
                RpcOutcome::Unimplemented(_) => ctl
                    .logger
                    .warn("Server does not implement Application.Init; continuing"),
                failure => failure
                    .into_result("Init")
                    .map_err(|e| WorkflowError::rpc(STEP, e))?,
            }
            Ok(())
        })
    }

    /// Connected → VideoConfigured.
    pub fn configure_video(&mut self) -> WorkflowResult<()> {
        const STEP: &str = "configure_video";
        self.transition(STEP, WorkflowState::Connected, |ctl| {
            let video = ctl.config.video.clone();
            let model = ctl.config.test.model_name.clone();
            ctl.logger.info(&format!(
                "Configuring video source {} ({}) at resolution {} in {} mode",
                video.device_name, video.driver_id, video.resolution, video.mode
            ));

            let mut payload = json!({
                "device_name": video.device_name,
                "driver_id": video.driver_id,
                "resolution": video.resolution,
                "share_with_model": model,
                "mode": video.mode.to_string(),
            });
            match video.mode {
                VideoMode::Webcam => {
                    if let Some(index) = video.webcam_index {
                        payload["webcam_index"] = json!(index);
                    }
                }
                VideoMode::File => {
                    let path = video.file_path.as_deref().map(expand_home).ok_or_else(|| {
                        let err = ConfigError::invalid_value(
                            "video.filePath",
                            "a video file must be provided when mode is 'file'",
                        );
                        WorkflowError::config(STEP, err)
                    })?;
                    if !path.exists() {
                        let err = ConfigError::invalid_value(
                            "video.filePath",
                            format!("configured video file does not exist: {}", path.display()),
                        );
                        return Err(WorkflowError::config(STEP, err));
                    }
                    payload["file_path"] = json!(path.display().to_string());
                    payload["loop_file"] = json!(video.loop_file);
                }
                VideoMode::Device => {}
            }

            ctl.transport
                .modify_video_config(&video.device_name, &payload.to_string(), &model)
                .into_result("ModifyVideoAudioConfig")
                .map_err(|e| WorkflowError::rpc(STEP, e))?;

            let activated = ctl
                .transport
                .set_video_audio(&video.device_name, true)
                .into_result("SetVideoAudio")
                .map_err(|e| WorkflowError::rpc(STEP, e))?;
            ctl.check_ack("SetVideoAudio", activated);
            Ok(())
        })
    }

    /// VideoConfigured → ModelHostConfigured.
    pub fn configure_model_host(&mut self) -> WorkflowResult<()> {
        const STEP: &str = "configure_model_host";
        self.transition(STEP, WorkflowState::VideoConfigured, |ctl| {
            let dut = &ctl.config.device_under_test;
            let payload = json!({
                "executable": dut.executable.display().to_string(),
                "config_file": dut.config_file.display().to_string(),
                "parallel_instances": dut.parallel_instances,
            });
            let timeout_secs = ctl.config.model_host_timeout_secs();
            let model = ctl.config.test.model_name.clone();

            let accepted = ctl
                .transport
                .modify_model_node_config(&model, &payload.to_string(), timeout_secs)
                .into_result("ModifyModelNodeConfig")
                .map_err(|e| WorkflowError::rpc(STEP, e))?;
            ctl.check_ack("ModifyModelNodeConfig", accepted);
            Ok(())
        })
    }

    /// ModelHostConfigured → ModelLoaded.
    pub fn load_model(&mut self) -> WorkflowResult<()> {
        const STEP: &str = "load_model";
        self.transition(STEP, WorkflowState::ModelHostConfigured, |ctl| {
            let model = ctl.config.test.model_name.clone();
            ctl.logger
                .info(&format!("Loading detection model '{}'", model));
            let loaded = ctl
                .transport
                .load_model(&model)
                .into_result("LoadModel")
                .map_err(|e| WorkflowError::rpc(STEP, e))?;
            ctl.check_ack("LoadModel", loaded);
            Ok(())
        })
    }

    /// ModelLoaded → Measuring.
    ///
    /// Tries each start strategy in order. A strategy the server does not
    /// implement falls through to the next one; any other failure is fatal.
    pub fn start_measurement(&mut self) -> WorkflowResult<()> {
        const STEP: &str = "start_measurement";
        self.transition(STEP, WorkflowState::ModelLoaded, |ctl| {
            for strategy in ctl.strategies.clone() {
                ctl.logger
                    .info(&format!("Starting measurement via {}", strategy.start_operation()));
                match ctl.send_start(strategy) {
                    RpcOutcome::Success(()) => {
                        ctl.active_strategy = Some(strategy);
                        ctl.started_at = Some(ctl.clock.timestamp());
                        ctl.logger
                            .success(&format!("Measurement started ({})", strategy));
                        return Ok(());
                    }
                    RpcOutcome::Unimplemented(_) => {
                        ctl.logger.info(&format!(
                            "{} not supported by server, trying next strategy",
                            strategy.start_operation()
                        ));
                    }
                    failure => {
                        return failure
                            .into_result(strategy.start_operation())
                            .map_err(|e| WorkflowError::rpc(STEP, e));
                    }
                }
            }
            Err(WorkflowError::rpc(
                STEP,
                RpcError::Unimplemented {
                    operation: "start measurement".to_string(),
                    detail: "no start strategy is supported by the server".to_string(),
                },
            ))
        })
    }

    /// Poll the configured signals while Measuring.
    pub fn wait_for_completion(
        &mut self,
        max_duration: Option<Duration>,
        poll_interval: Duration,
    ) -> WorkflowResult<Vec<SignalSample>> {
        const STEP: &str = "wait_for_completion";
        self.begin(STEP, WorkflowState::Measuring)?;

        let signals = self.config.test.log_signals.clone();
        let polled = SignalPoller::new(&self.clock, &self.logger, &self.cancel, &signals)
            .max_duration(max_duration)
            .poll_interval(poll_interval)
            .run(&mut self.transport);

        polled.map_err(|e| self.fail(e))
    }

    /// Measuring → Stopped.
    pub fn stop_measurement(&mut self) -> WorkflowResult<()> {
        const STEP: &str = "stop_measurement";
        self.transition(STEP, WorkflowState::Measuring, |ctl| {
            ctl.send_stop().map_err(|e| WorkflowError::rpc(STEP, e))
        })
    }

    /// Stopped → ResultFetched.
    pub fn fetch_result(&mut self) -> WorkflowResult<TestResult> {
        const STEP: &str = "fetch_result";
        let mut fetched = None;
        self.transition(STEP, WorkflowState::Stopped, |ctl| {
            let result = ctl
                .transport
                .get_result()
                .into_result("GetResult")
                .map_err(|e| WorkflowError::rpc(STEP, e))?;
            ctl.logger.info(&format!(
                "Test result: {} (additional {}, protocol {})",
                result.code, result.additional_code, result.add_to_protocol
            ));
            fetched = Some(result);
            Ok(())
        })?;
        Ok(fetched.unwrap_or_default())
    }

    /// Run the whole workflow and tear down afterwards.
    pub fn run(&mut self, options: &RunOptions) -> WorkflowResult<RunReport> {
        let result = self.run_steps(options);
        self.teardown();
        result
    }

    /// Tear down after a successful run.
    pub fn finish(&mut self) {
        self.teardown();
    }

    fn run_steps(&mut self, options: &RunOptions) -> WorkflowResult<RunReport> {
        self.launch_helper(options.skip_helper_launch)?;
        self.connect()?;
        self.launch_model_host(options.skip_model_host_launch)?;
        self.configure_video()?;
        self.configure_model_host()?;
        self.load_model()?;
        self.start_measurement()?;
        let samples = self.wait_for_completion(options.max_duration, options.poll_interval)?;
        self.stop_measurement()?;
        let result = self.fetch_result()?;

        let now = self.clock.timestamp();
        self.logger.success("Automation workflow completed");
        Ok(RunReport {
            model_name: self.config.test.model_name.clone(),
            endpoint: self.config.connection.endpoint(),
            strategy: self.active_strategy.unwrap_or(StartStrategy::Measure),
            started_at: self.started_at.unwrap_or(now),
            stopped_at: self.stopped_at.unwrap_or(now),
            samples,
            result,
        })
    }

    /// Check cancellation and the required state before a step.
    fn begin(&mut self, step: &str, expected: WorkflowState) -> WorkflowResult<()> {
        if self.cancel.is_cancelled() {
            self.logger
                .warn(&format!("Workflow cancelled before '{}'", step));
            return Err(self.fail(WorkflowError::interrupted(step)));
        }
        if self.state != expected {
            let err = WorkflowError::InvalidTransition {
                step: step.to_string(),
                from: self.state,
                expected,
            };
            return Err(self.fail(err));
        }
        self.logger.phase(step);
        Ok(())
    }

    /// Run `body` from `from` and advance to the next state on success.
    fn transition<F>(&mut self, step: &str, from: WorkflowState, body: F) -> WorkflowResult<()>
    where
        F: FnOnce(&mut Self) -> WorkflowResult<()>,
    {
        self.begin(step, from)?;
        match body(self) {
            Ok(()) => {
                self.state = from.next().unwrap_or(WorkflowState::Failed);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, err: WorkflowError) -> WorkflowError {
        if err.is_interrupted() {
            self.logger.warn(&err.to_string());
        } else {
            self.logger.error(&err.to_string());
        }
        self.state = WorkflowState::Failed;
        self.teardown();
        err
    }

    fn check_ack(&self, operation: &str, accepted: bool) {
        if !accepted {
            self.logger
                .warn(&format!("Server reported {} as unsuccessful", operation));
        }
    }

    fn send_start(&mut self, strategy: StartStrategy) -> RpcOutcome<()> {
        match strategy {
            StartStrategy::TestingService => {
                let model = self.config.test.model_name.clone();
                let config_file = self.config.device_under_test.config_file.display().to_string();
                match self.transport.start_testing(&model, &config_file) {
                    RpcOutcome::Success(reply) if !reply.success => RpcOutcome::Unexpected(
                        format!("server refused to start testing: {}", reply.message),
                    ),
                    other => other.map(|_| ()),
                }
            }
            StartStrategy::Measure => {
                let outcome = self.transport.start_measurement(false);
                if let RpcOutcome::Success(accepted) = outcome {
                    self.check_ack("MeasureStart", accepted);
                }
                outcome.map(|_| ())
            }
        }
    }

    /// Issue the stop matching the active strategy. Attempted at most once.
    fn send_stop(&mut self) -> Result<(), RpcError> {
        let Some(strategy) = self.active_strategy else {
            return Ok(());
        };
        if self.stop_attempted {
            return Ok(());
        }
        self.stop_attempted = true;
        self.logger
            .info(&format!("Stopping measurement via {}", strategy.stop_operation()));

        let outcome = match strategy {
            StartStrategy::TestingService => self.transport.stop_testing().map(|_| ()),
            StartStrategy::Measure => self.transport.stop_measurement().map(|_| ()),
        };
        self.stopped_at = Some(self.clock.timestamp());
        outcome.into_result(strategy.stop_operation())
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.logger.phase("teardown");

        if self.active_strategy.is_some() && !self.stop_attempted {
            if let Err(e) = self.send_stop() {
                self.logger
                    .warn(&format!("Best-effort stop during teardown failed: {}", e));
            }
        }

        self.processes.terminate_all();

        if self.connected {
            self.transport.close();
            self.connected = false;
        }
    }
}

impl<T: AutomationTransport, C: Clock> Drop for Controller<T, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_str;
    use crate::logging::LogLevel;
    use crate::orchestrator::testing::{ManualClock, ScriptedTransport};
    use crate::process::TerminationPolicy;
    use crate::rpc::proto::StartTestReply;
    use crate::rpc::SignalValue;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const CONFIG: &str = "\
connection:
  host: localhost
  port: 50051
deviceUnderTest:
  timeoutMs: 2500
  parallelInstances: 2
video:
  deviceName: FrontCam
  driverId: uvc
  resolution: 1280x720
test:
  modelName: IconDetection
  logSignals:
    - AI.Result
    - AI.Score
logging:
";

    fn fast_termination() -> TerminationPolicy {
        TerminationPolicy {
            interrupt_grace: Duration::from_millis(300),
            terminate_grace: Duration::from_millis(300),
        }
    }

    fn config() -> Configuration {
        load_str(CONFIG).unwrap()
    }

    fn controller(
        config: Configuration,
        transport: ScriptedTransport,
    ) -> Controller<ScriptedTransport, ManualClock> {
        controller_with_cancel(config, transport, CancelHandle::new())
    }

    fn controller_with_cancel(
        config: Configuration,
        transport: ScriptedTransport,
        cancel: CancelHandle,
    ) -> Controller<ScriptedTransport, ManualClock> {
        crate::logging::init_test_tracing();
        let logger = Arc::new(RunLogger::console(LogLevel::Debug));
        let processes = ProcessManager::with_policy(Arc::clone(&logger), fast_termination());
        Controller::with_parts(config, logger, transport, processes, ManualClock::new(), cancel)
    }

    fn transport() -> ScriptedTransport {
        ScriptedTransport::new()
            .running_sequence(&[true, true, false])
            .with_signal("AI.Result", SignalValue::Text("Stop".into()))
            .with_signal("AI.Score", SignalValue::Float(0.93))
    }

    fn skip_launches() -> RunOptions {
        RunOptions {
            skip_helper_launch: true,
            skip_model_host_launch: true,
            ..RunOptions::default()
        }
    }

    #[test]
    fn full_run_uses_testing_service_and_matching_stop() {
        let mut ctl = controller(config(), transport());
        let report = ctl.run(&skip_launches()).unwrap();

        assert_eq!(ctl.state(), WorkflowState::ResultFetched);
        assert_eq!(report.strategy, StartStrategy::TestingService);
        assert_eq!(report.samples.len(), 3);
        assert_eq!(report.result.code, 1);
        assert!(report.started_at <= report.stopped_at);

        let t = ctl.transport();
        assert_eq!(t.count("StartTesting"), 1);
        assert_eq!(t.count("StopTesting"), 1);
        assert_eq!(t.count("MeasureStart"), 0);
        assert_eq!(t.count("MeasureStop"), 0);
        assert_eq!(t.count("Close"), 1);
        assert_eq!(
            &t.calls[..6],
            &[
                "Connect",
                "Init",
                "ModifyVideoAudioConfig",
                "SetVideoAudio",
                "ModifyModelNodeConfig",
                "LoadModel"
            ]
        );
    }

    #[test]
    fn unimplemented_start_falls_back_to_measure() {
        let mut transport = transport();
        transport.start_testing = RpcOutcome::Unimplemented("unknown service".into());
        let mut ctl = controller(config(), transport);

        let report = ctl.run(&skip_launches()).unwrap();

        assert_eq!(report.strategy, StartStrategy::Measure);
        let t = ctl.transport();
        assert_eq!(t.count("MeasureStart"), 1);
        assert_eq!(t.count("MeasureStop"), 1);
        assert_eq!(t.count("StopTesting"), 0);
    }

    #[test]
    fn other_start_failures_do_not_fall_back() {
        let mut transport = transport();
        transport.start_testing = RpcOutcome::Unavailable("connection reset".into());
        let mut ctl = controller(config(), transport);

        let err = ctl.run(&skip_launches()).unwrap_err();

        assert_eq!(err.step(), "start_measurement");
        assert_eq!(ctl.state(), WorkflowState::Failed);
        let t = ctl.transport();
        assert_eq!(t.count("MeasureStart"), 0);
        assert_eq!(t.count("StopTesting"), 0);
        assert_eq!(t.count("MeasureStop"), 0);
    }

    #[test]
    fn refused_start_is_fatal() {
        let mut transport = transport();
        transport.start_testing = RpcOutcome::Success(StartTestReply {
            success: false,
            message: "model busy".into(),
        });
        let mut ctl = controller(config(), transport);

        let err = ctl.run(&skip_launches()).unwrap_err();
        assert!(err.to_string().contains("model busy"));
    }

    #[test]
    fn polling_failure_still_stops_measurement_once() {
        let transport = transport().running_outcomes(vec![
            RpcOutcome::Success(true),
            RpcOutcome::Unavailable("server went away".into()),
        ]);
        let mut ctl = controller(config(), transport);

        let err = ctl.run(&skip_launches()).unwrap_err();

        assert_eq!(err.step(), "wait_for_completion");
        assert_eq!(ctl.state(), WorkflowState::Failed);
        let t = ctl.transport();
        assert_eq!(t.count("StopTesting"), 1);
        assert_eq!(t.count("GetResult"), 0);
        assert_eq!(t.count("Close"), 1);
    }

    #[test]
    fn explicit_stop_is_not_repeated_by_teardown() {
        let mut ctl = controller(config(), transport());
        ctl.connect().unwrap();
        ctl.configure_video().unwrap();
        ctl.configure_model_host().unwrap();
        ctl.load_model().unwrap();
        ctl.start_measurement().unwrap();
        ctl.stop_measurement().unwrap();
        ctl.finish();
        ctl.finish();

        assert_eq!(ctl.state(), WorkflowState::Stopped);
        assert_eq!(ctl.transport().count("StopTesting"), 1);
        assert_eq!(ctl.transport().count("Close"), 1);
    }

    #[test]
    fn teardown_without_start_sends_no_stop() {
        let mut ctl = controller(config(), transport());
        ctl.connect().unwrap();
        ctl.finish();

        let t = ctl.transport();
        assert_eq!(t.count("StopTesting") + t.count("MeasureStop"), 0);
        assert_eq!(t.count("Close"), 1);
    }

    #[test]
    fn out_of_order_step_fails_fast() {
        let mut ctl = controller(config(), transport());
        let err = ctl.load_model().unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                from: WorkflowState::Idle,
                expected: WorkflowState::ModelHostConfigured,
                ..
            }
        ));
        assert_eq!(ctl.state(), WorkflowState::Failed);
        assert!(ctl.transport().calls.is_empty());
    }

    #[test]
    fn missing_video_file_fails_before_video_calls() {
        let mut cfg = config();
        cfg.video.mode = VideoMode::File;
        cfg.video.file_path = Some(PathBuf::from("/no/such/clip.mp4"));
        let mut ctl = controller(cfg, transport());

        let err = ctl.run(&skip_launches()).unwrap_err();

        assert!(matches!(err, WorkflowError::Config { .. }));
        assert_eq!(ctl.state(), WorkflowState::Failed);
        let t = ctl.transport();
        assert_eq!(t.count("ModifyVideoAudioConfig"), 0);
        assert_eq!(t.count("Close"), 1);
    }

    #[test]
    fn file_mode_payload_carries_path_and_loop_flag() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"not really a video").unwrap();

        let mut cfg = config();
        cfg.video.mode = VideoMode::File;
        cfg.video.file_path = Some(clip.clone());
        cfg.video.loop_file = true;
        let mut ctl = controller(cfg, transport());
        ctl.connect().unwrap();
        ctl.configure_video().unwrap();

        let payload: serde_json::Value =
            serde_json::from_str(ctl.transport().video_config.as_deref().unwrap()).unwrap();
        assert_eq!(payload["mode"], "file");
        assert_eq!(payload["file_path"], clip.display().to_string());
        assert_eq!(payload["loop_file"], true);
        assert_eq!(payload["share_with_model"], "IconDetection");
    }

    #[test]
    fn webcam_payload_carries_index() {
        let mut cfg = config();
        cfg.video.mode = VideoMode::Webcam;
        cfg.video.webcam_index = Some(2);
        let mut ctl = controller(cfg, transport());
        ctl.connect().unwrap();
        ctl.configure_video().unwrap();

        let payload: serde_json::Value =
            serde_json::from_str(ctl.transport().video_config.as_deref().unwrap()).unwrap();
        assert_eq!(payload["webcam_index"], 2);
        assert!(payload.get("file_path").is_none());
    }

    #[test]
    fn model_host_config_rounds_timeout_up() {
        let mut ctl = controller(config(), transport());
        ctl.connect().unwrap();
        ctl.configure_video().unwrap();
        ctl.configure_model_host().unwrap();

        let (payload, timeout) = ctl.transport().model_node_config.clone().unwrap();
        let payload: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(timeout, 3);
        assert_eq!(payload["parallel_instances"], 2);
    }

    #[test]
    fn unimplemented_init_is_tolerated() {
        let mut transport = transport();
        transport.init = RpcOutcome::Unimplemented("no Application service".into());
        let mut ctl = controller(config(), transport);

        ctl.connect().unwrap();
        assert_eq!(ctl.state(), WorkflowState::Connected);
    }

    #[test]
    fn connection_failure_fails_the_workflow() {
        let mut transport = transport();
        transport.connect_error = Some("refused".into());
        let mut ctl = controller(config(), transport);

        let err = ctl.connect().unwrap_err();
        assert!(matches!(err, WorkflowError::Rpc { source: RpcError::Connection { .. }, .. }));
        assert_eq!(ctl.transport().count("Close"), 0);
    }

    #[test]
    fn cancellation_interrupts_at_step_boundary() {
        let cancel = CancelHandle::new();
        let mut ctl = controller_with_cancel(config(), transport(), cancel.clone());
        ctl.connect().unwrap();
        cancel.cancel();

        let err = ctl.configure_video().unwrap_err();
        assert!(err.is_interrupted());
        assert_eq!(ctl.state(), WorkflowState::Failed);
        assert_eq!(ctl.transport().count("Close"), 1);
    }

    #[test]
    fn missing_helper_executable_is_fatal() {
        let mut cfg = config();
        cfg.test.helper_executable = Some(PathBuf::from("/no/such/automation-server"));
        let mut ctl = controller(cfg, transport());

        let err = ctl.launch_helper(false).unwrap_err();
        assert!(matches!(err, WorkflowError::Process { .. }));
        assert_eq!(ctl.state(), WorkflowState::Failed);
    }

    #[test]
    fn unconfigured_helper_is_skipped() {
        let mut ctl = controller(config(), transport());
        assert!(!ctl.launch_helper(false).unwrap());
        assert_eq!(ctl.state(), WorkflowState::Idle);
    }

    #[test]
    fn missing_model_host_is_only_a_warning() {
        let mut cfg = config();
        cfg.device_under_test.executable = PathBuf::from("/no/such/model-host");
        let mut ctl = controller(cfg, transport());
        ctl.connect().unwrap();

        assert!(!ctl.launch_model_host(false).unwrap());
        assert_eq!(ctl.state(), WorkflowState::Connected);
    }

    #[cfg(unix)]
    #[test]
    fn launched_helper_is_released_on_teardown() {
        let mut cfg = config();
        cfg.test.helper_executable = Some(PathBuf::from("/bin/sh"));
        let mut ctl = controller(cfg, transport()).with_helper_settle(Duration::ZERO);

        assert!(ctl.launch_helper(false).unwrap());
        assert_eq!(ctl.process_count(), 1);

        ctl.finish();
        assert_eq!(ctl.process_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn load_model_failure_releases_everything_without_stop() {
        let dir = tempdir().unwrap();
        let host_script = dir.path().join("model-host.sh");
        std::fs::write(&host_script, "sleep 30\n").unwrap();

        let mut cfg = config();
        cfg.test.helper_executable = Some(PathBuf::from("/bin/sh"));
        cfg.device_under_test.executable = PathBuf::from("/bin/sh");
        cfg.device_under_test.config_file = host_script;
        let mut transport = transport();
        transport.load_model = RpcOutcome::Timeout;
        let mut ctl = controller(cfg, transport).with_helper_settle(Duration::ZERO);

        let err = ctl.run(&RunOptions::default()).unwrap_err();

        assert_eq!(err.step(), "load_model");
        assert_eq!(ctl.state(), WorkflowState::Failed);
        assert_eq!(ctl.process_count(), 0);
        let t = ctl.transport();
        assert_eq!(t.count("StartTesting") + t.count("MeasureStart"), 0);
        assert_eq!(t.count("StopTesting"), 0);
        assert_eq!(t.count("MeasureStop"), 0);
        assert_eq!(t.count("Close"), 1);
    }

    #[test]
    fn result_failure_after_stop_does_not_stop_again() {
        let mut transport = transport();
        transport.result = RpcOutcome::Unavailable("server went away".into());
        let mut ctl = controller(config(), transport);

        let err = ctl.run(&skip_launches()).unwrap_err();

        assert_eq!(err.step(), "fetch_result");
        assert_eq!(ctl.state(), WorkflowState::Failed);
        let t = ctl.transport();
        assert_eq!(t.count("GetResult"), 1);
        assert_eq!(t.count("StopTesting"), 1);
        assert_eq!(t.count("Close"), 1);
    }

    #[test]
    fn failed_fallback_start_sends_no_stop() {
        let mut transport = transport();
        transport.start_testing = RpcOutcome::Unimplemented("unknown service".into());
        transport.start_measurement = RpcOutcome::Timeout;
        let mut ctl = controller(config(), transport);

        let err = ctl.run(&skip_launches()).unwrap_err();

        assert_eq!(err.step(), "start_measurement");
        assert!(matches!(err, WorkflowError::Rpc { source: RpcError::Timeout { .. }, .. }));
        assert_eq!(ctl.active_strategy(), None);
        let t = ctl.transport();
        assert_eq!(t.count("MeasureStart"), 1);
        assert_eq!(t.count("MeasureStop") + t.count("StopTesting"), 0);
        assert_eq!(t.count("MeasureIsRunning"), 0);
        assert_eq!(t.count("Close"), 1);
    }
}
