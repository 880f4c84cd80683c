//! The seam between the controller and the remote automation server.

use std::time::Duration;

use super::errors::RpcResult;
use super::outcome::RpcOutcome;
use super::proto::{StartTestReply, StopTestReply};
use super::types::{SignalValue, TestResult};

/// Remote operations the controller needs.
///
/// Every call blocks until the server answers or the call timeout expires.
/// Implementations never retry.
pub trait AutomationTransport {
    /// Open the channel, waiting at most `deadline` for it to become ready.
    fn connect(&mut self, endpoint: &str, deadline: Duration) -> RpcResult<()>;

    /// `Application.Init`
    fn init(&mut self) -> RpcOutcome<()>;

    /// `System.ModifyVideoAudioConfig`
    fn modify_video_config(
        &mut self,
        source_name: &str,
        config: &str,
        share_with_model: &str,
    ) -> RpcOutcome<()>;

    /// `Measure.SetVideoAudio` with both streams unpaused.
    fn set_video_audio(&mut self, name: &str, activate: bool) -> RpcOutcome<bool>;

    /// `System.ModifyModelNodeConfig`
    fn modify_model_node_config(
        &mut self,
        model: &str,
        config: &str,
        timeout_secs: i32,
    ) -> RpcOutcome<bool>;

    /// `System.LoadModel`
    fn load_model(&mut self, model: &str) -> RpcOutcome<bool>;

    /// `TestAutomationService.StartTesting`
    fn start_testing(&mut self, model: &str, config_file: &str) -> RpcOutcome<StartTestReply>;

    /// `TestAutomationService.StopTesting`
    fn stop_testing(&mut self) -> RpcOutcome<StopTestReply>;

    /// `Measure.Start`
    fn start_measurement(&mut self, save_to_disk: bool) -> RpcOutcome<bool>;

    /// `Measure.Stop`
    fn stop_measurement(&mut self) -> RpcOutcome<bool>;

    /// `Measure.IsRunning`
    fn is_running(&mut self) -> RpcOutcome<bool>;

    /// `System.GetSignal`; `None` when the reply carries no value.
    fn read_signal(&mut self, name: &str, interpreted: bool) -> RpcOutcome<Option<SignalValue>>;

    /// `System.GetResult`
    fn get_result(&mut self) -> RpcOutcome<TestResult>;

    /// Drop the channel. Safe to call more than once.
    fn close(&mut self);
}
