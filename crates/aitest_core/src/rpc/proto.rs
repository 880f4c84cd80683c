//! Message definitions for the `testautomation` RPC package.
//!
//! Only the messages the runner exchanges are defined. Field tags follow the
//! server's published schema.

/// `/testautomation.Application/Init`
pub const APPLICATION_INIT: &str = "/testautomation.Application/Init";
/// `/testautomation.System/ModifyVideoAudioConfig`
pub const SYSTEM_MODIFY_VIDEO_AUDIO_CONFIG: &str = "/testautomation.System/ModifyVideoAudioConfig";
/// `/testautomation.System/ModifyModelNodeConfig`
pub const SYSTEM_MODIFY_MODEL_NODE_CONFIG: &str = "/testautomation.System/ModifyModelNodeConfig";
/// `/testautomation.System/LoadModel`
pub const SYSTEM_LOAD_MODEL: &str = "/testautomation.System/LoadModel";
/// `/testautomation.System/GetSignal`
pub const SYSTEM_GET_SIGNAL: &str = "/testautomation.System/GetSignal";
/// `/testautomation.System/GetResult`
pub const SYSTEM_GET_RESULT: &str = "/testautomation.System/GetResult";
/// `/testautomation.Measure/SetVideoAudio`
pub const MEASURE_SET_VIDEO_AUDIO: &str = "/testautomation.Measure/SetVideoAudio";
/// `/testautomation.Measure/Start`
pub const MEASURE_START: &str = "/testautomation.Measure/Start";
/// `/testautomation.Measure/Stop`
pub const MEASURE_STOP: &str = "/testautomation.Measure/Stop";
/// `/testautomation.Measure/IsRunning`
pub const MEASURE_IS_RUNNING: &str = "/testautomation.Measure/IsRunning";
/// `/testautomation.TestAutomationService/StartTesting`
pub const TESTING_START: &str = "/testautomation.TestAutomationService/StartTesting";
/// `/testautomation.TestAutomationService/StopTesting`
pub const TESTING_STOP: &str = "/testautomation.TestAutomationService/StopTesting";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApplicationInitRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ApplicationInitReply {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemModifyVideoAudioConfigRequest {
    #[prost(string, tag = "1")]
    pub str_source_name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub str_config: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub str_share_with_model_node: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemModifyVideoAudioConfigReply {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemModifyModelNodeConfigRequest {
    #[prost(string, tag = "1")]
    pub str_model_node_name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub str_config: ::prost::alloc::string::String,
    #[prost(int32, tag = "3")]
    pub l_timeout_in_seconds: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemModifyModelNodeConfigReply {
    #[prost(bool, tag = "1")]
    pub ret_val: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemLoadModelRequest {
    #[prost(string, tag = "1")]
    pub str_model_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemLoadModelReply {
    #[prost(bool, tag = "1")]
    pub ret_val: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemGetSignalRequest {
    #[prost(string, tag = "1")]
    pub str_signal_name: ::prost::alloc::string::String,
    #[prost(bool, tag = "2")]
    pub b_interpreted: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemGetSignalReply {
    #[prost(oneof = "system_get_signal_reply::RetVal", tags = "31, 33, 35, 40")]
    pub ret_val: ::core::option::Option<system_get_signal_reply::RetVal>,
}

/// Nested types for [`SystemGetSignalReply`].
pub mod system_get_signal_reply {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum RetVal {
        #[prost(double, tag = "31")]
        RetValDouble(f64),
        #[prost(int64, tag = "33")]
        RetValInt64(i64),
        #[prost(uint64, tag = "35")]
        RetValUint64(u64),
        #[prost(string, tag = "40")]
        RetValString(::prost::alloc::string::String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemGetResultRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SystemGetResultReply {
    #[prost(int32, tag = "1")]
    pub ret_val: i32,
    #[prost(int32, tag = "2")]
    pub pi_additional_result_value: i32,
    #[prost(bool, tag = "3")]
    pub pb_add_result_to_protocol: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeasureSetVideoAudioRequest {
    #[prost(string, tag = "1")]
    pub str_name: ::prost::alloc::string::String,
    #[prost(bool, tag = "2")]
    pub b_activate: bool,
    #[prost(bool, tag = "3")]
    pub b_pause_video_initially: bool,
    #[prost(bool, tag = "4")]
    pub b_pause_audio_initially: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeasureSetVideoAudioReply {
    #[prost(bool, tag = "1")]
    pub ret_val: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeasureStartRequest {
    #[prost(bool, tag = "1")]
    pub b_save_to_disk: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeasureStartReply {
    #[prost(bool, tag = "1")]
    pub ret_val: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeasureStopRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeasureStopReply {
    #[prost(bool, tag = "1")]
    pub ret_val: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeasureIsRunningRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MeasureIsRunningReply {
    #[prost(bool, tag = "1")]
    pub ret_val: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartTestRequest {
    #[prost(string, tag = "1")]
    pub model: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub str_config_file: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StartTestReply {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopTestRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StopTestReply {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}
