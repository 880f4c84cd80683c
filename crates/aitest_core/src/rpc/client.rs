//! gRPC client for the automation server.
//!
//! The client owns a current-thread runtime and blocks on each call, so at
//! most one call is in flight at any time.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;

use crate::logging::RunLogger;

use super::errors::{RpcError, RpcResult};
use super::outcome::RpcOutcome;
use super::proto::{self, StartTestReply, StopTestReply};
use super::transport::AutomationTransport;
use super::types::{SignalValue, TestResult};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Blocking client for the `testautomation` services.
///
/// Every call made through [`AutomationTransport`] uses the timeout given to
/// [`RpcClient::new`]; [`RpcClient::call_with_timeout`] overrides it for a
/// single call.
pub struct RpcClient {
    logger: Arc<RunLogger>,
    runtime: Runtime,
    channel: Option<Channel>,
    call_timeout: Duration,
}

impl RpcClient {
    /// Create a disconnected client using `call_timeout` for every call.
    pub fn new(logger: Arc<RunLogger>, call_timeout: Duration) -> RpcResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self {
            logger,
            runtime,
            channel: None,
            call_timeout,
        })
    }

    /// Whether a channel is open.
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// The timeout applied when a call gives none.
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Issue one unary call with the client's timeout and classify the result.
    pub fn call<Req, Resp>(
        &self,
        operation: &str,
        path: &'static str,
        request: Req,
    ) -> RpcOutcome<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.call_with_timeout(operation, path, request, self.call_timeout)
    }

    /// Issue one unary call bounded by `timeout`.
    pub fn call_with_timeout<Req, Resp>(
        &self,
        operation: &str,
        path: &'static str,
        request: Req,
        timeout: Duration,
    ) -> RpcOutcome<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let Some(channel) = self.channel.clone() else {
            let outcome = RpcOutcome::Unavailable("channel is not connected".to_string());
            self.log_failure(operation, timeout, &outcome);
            return outcome;
        };

        self.logger.trace(&format!("RPC {} -> {}", operation, path));

        let outcome = self.runtime.block_on(async move {
            let mut grpc = tonic::client::Grpc::new(channel);
            let exchange = async {
                grpc.ready()
                    .await
                    .map_err(|e| Status::unavailable(format!("service was not ready: {}", e)))?;
                let mut request = tonic::Request::new(request);
                request.set_timeout(timeout);
                let codec = tonic_prost::ProstCodec::default();
                grpc.unary(request, PathAndQuery::from_static(path), codec).await
            };

            match tokio::time::timeout(timeout, exchange).await {
                Ok(Ok(response)) => RpcOutcome::Success(response.into_inner()),
                Ok(Err(status)) => RpcOutcome::from_status(&status),
                Err(_) => RpcOutcome::Timeout,
            }
        });

        self.log_failure(operation, timeout, &outcome);
        outcome
    }

    fn log_failure<T>(&self, operation: &str, timeout: Duration, outcome: &RpcOutcome<T>) {
        match outcome {
            RpcOutcome::Success(_) => {}
            RpcOutcome::Timeout => self.logger.error(&format!(
                "RPC {} timed out after {}ms",
                operation,
                timeout.as_millis()
            )),
            RpcOutcome::Unimplemented(detail) => self
                .logger
                .warn(&format!("RPC {} is not implemented by the server: {}", operation, detail)),
            other => {
                if let Some(detail) = other.failure_detail() {
                    self.logger.error(&format!("RPC {} failed: {}", operation, detail));
                }
            }
        }
    }
}

impl AutomationTransport for RpcClient {
    fn connect(&mut self, endpoint: &str, deadline: Duration) -> RpcResult<()> {
        let uri = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("http://{}", endpoint)
        };

        let target = Endpoint::from_shared(uri)
            .map_err(|e| RpcError::connection(endpoint, format!("invalid endpoint: {}", e)))?
            .connect_timeout(deadline)
            .http2_keep_alive_interval(KEEPALIVE_INTERVAL)
            .keep_alive_timeout(KEEPALIVE_TIMEOUT)
            .keep_alive_while_idle(true);

        self.logger.info(&format!("Connecting to automation server at {}", endpoint));
        let channel = self
            .runtime
            .block_on(async { tokio::time::timeout(deadline, target.connect()).await })
            .map_err(|_| {
                RpcError::connection(
                    endpoint,
                    format!("channel not ready within {}ms", deadline.as_millis()),
                )
            })?
            .map_err(|e| RpcError::connection(endpoint, e.to_string()))?;

        self.channel = Some(channel);
        self.logger.info(&format!("Successfully connected to {}", endpoint));
        Ok(())
    }

    fn init(&mut self) -> RpcOutcome<()> {
        let request = proto::ApplicationInitRequest {};
        self.call::<_, proto::ApplicationInitReply>("Init", proto::APPLICATION_INIT, request)
            .map(|_| ())
    }

    fn modify_video_config(
        &mut self,
        source_name: &str,
        config: &str,
        share_with_model: &str,
    ) -> RpcOutcome<()> {
        let request = proto::SystemModifyVideoAudioConfigRequest {
            str_source_name: source_name.to_string(),
            str_config: config.to_string(),
            str_share_with_model_node: share_with_model.to_string(),
        };
        self.call::<_, proto::SystemModifyVideoAudioConfigReply>(
            "ModifyVideoAudioConfig",
            proto::SYSTEM_MODIFY_VIDEO_AUDIO_CONFIG,
            request,
        )
        .map(|_| ())
    }

    fn set_video_audio(&mut self, name: &str, activate: bool) -> RpcOutcome<bool> {
        let request = proto::MeasureSetVideoAudioRequest {
            str_name: name.to_string(),
            b_activate: activate,
            b_pause_video_initially: false,
            b_pause_audio_initially: false,
        };
        self.call::<_, proto::MeasureSetVideoAudioReply>(
            "SetVideoAudio",
            proto::MEASURE_SET_VIDEO_AUDIO,
            request,
        )
        .map(|reply| reply.ret_val)
    }

    fn modify_model_node_config(
        &mut self,
        model: &str,
        config: &str,
        timeout_secs: i32,
    ) -> RpcOutcome<bool> {
        let request = proto::SystemModifyModelNodeConfigRequest {
            str_model_node_name: model.to_string(),
            str_config: config.to_string(),
            l_timeout_in_seconds: timeout_secs,
        };
        self.call::<_, proto::SystemModifyModelNodeConfigReply>(
            "ModifyModelNodeConfig",
            proto::SYSTEM_MODIFY_MODEL_NODE_CONFIG,
            request,
        )
        .map(|reply| reply.ret_val)
    }

    fn load_model(&mut self, model: &str) -> RpcOutcome<bool> {
        let request = proto::SystemLoadModelRequest {
            str_model_name: model.to_string(),
        };
        self.call::<_, proto::SystemLoadModelReply>("LoadModel", proto::SYSTEM_LOAD_MODEL, request)
            .map(|reply| reply.ret_val)
    }

    fn start_testing(&mut self, model: &str, config_file: &str) -> RpcOutcome<StartTestReply> {
        let request = proto::StartTestRequest {
            model: model.to_string(),
            str_config_file: config_file.to_string(),
        };
        self.call("StartTesting", proto::TESTING_START, request)
    }

    fn stop_testing(&mut self) -> RpcOutcome<StopTestReply> {
        self.call("StopTesting", proto::TESTING_STOP, proto::StopTestRequest {})
    }

    fn start_measurement(&mut self, save_to_disk: bool) -> RpcOutcome<bool> {
        let request = proto::MeasureStartRequest {
            b_save_to_disk: save_to_disk,
        };
        self.call::<_, proto::MeasureStartReply>("MeasureStart", proto::MEASURE_START, request)
            .map(|reply| reply.ret_val)
    }

    fn stop_measurement(&mut self) -> RpcOutcome<bool> {
        let request = proto::MeasureStopRequest {};
        self.call::<_, proto::MeasureStopReply>("MeasureStop", proto::MEASURE_STOP, request)
            .map(|reply| reply.ret_val)
    }

    fn is_running(&mut self) -> RpcOutcome<bool> {
        self.call::<_, proto::MeasureIsRunningReply>(
            "MeasureIsRunning",
            proto::MEASURE_IS_RUNNING,
            proto::MeasureIsRunningRequest {},
        )
        .map(|reply| reply.ret_val)
    }

    fn read_signal(&mut self, name: &str, interpreted: bool) -> RpcOutcome<Option<SignalValue>> {
        let request = proto::SystemGetSignalRequest {
            str_signal_name: name.to_string(),
            b_interpreted: interpreted,
        };
        let operation = format!("GetSignal[{}]", name);
        self.call::<_, proto::SystemGetSignalReply>(&operation, proto::SYSTEM_GET_SIGNAL, request)
            .map(|reply| reply.ret_val.map(SignalValue::from))
    }

    fn get_result(&mut self) -> RpcOutcome<TestResult> {
        let request = proto::SystemGetResultRequest {};
        self.call::<_, proto::SystemGetResultReply>("GetResult", proto::SYSTEM_GET_RESULT, request)
            .map(|reply| TestResult {
                code: reply.ret_val,
                additional_code: reply.pi_additional_result_value,
                add_to_protocol: reply.pb_add_result_to_protocol,
            })
    }

    fn close(&mut self) {
        if self.channel.take().is_some() {
            self.logger.info("Closed connection to automation server");
        }
    }
}
