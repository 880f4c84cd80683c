//! Typed run configuration with named defaults.
//!
//! The configuration is organized into five required sections that map to
//! the top-level blocks of the configuration file. Missing fields fall back
//! to the defaults documented on each field; unknown keys are ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};
use super::parser::Value;

/// Default RPC timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Lower bound applied to every RPC deadline.
pub const MIN_RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Required sections, in the order they are checked.
pub const REQUIRED_SECTIONS: [&str; 5] =
    ["connection", "deviceUnderTest", "video", "test", "logging"];

/// Root configuration containing all sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub connection: ConnectionSettings,
    pub device_under_test: DeviceUnderTestSettings,
    pub video: VideoSettings,
    pub test: TestSettings,
    pub logging: LoggingSettings,
}

/// Endpoint of the remote automation server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Host name. Default `localhost`.
    pub host: String,
    /// TCP port. Default `50051`.
    pub port: u16,
}

impl ConnectionSettings {
    /// `host:port` form of the endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 50051,
        }
    }
}

/// The detection model host executable that performs inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceUnderTestSettings {
    /// Model host executable. Default empty (not launched).
    pub executable: PathBuf,
    /// Inference configuration file passed to the host. Default empty.
    pub config_file: PathBuf,
    /// RPC timeout in milliseconds. Default 10000; 0 means default.
    pub timeout_ms: u64,
    /// Parallel inference instances. Default 1.
    pub parallel_instances: u32,
}

impl Default for DeviceUnderTestSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::new(),
            config_file: PathBuf::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            parallel_instances: 1,
        }
    }
}

/// How the video source is fed into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoMode {
    /// Physical capture device.
    #[default]
    Device,
    /// Local webcam, optionally selected by index.
    Webcam,
    /// Recorded video file.
    File,
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoMode::Device => write!(f, "device"),
            VideoMode::Webcam => write!(f, "webcam"),
            VideoMode::File => write!(f, "file"),
        }
    }
}

impl FromStr for VideoMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "device" => Ok(VideoMode::Device),
            "webcam" => Ok(VideoMode::Webcam),
            "file" => Ok(VideoMode::File),
            other => Err(ConfigError::invalid_value(
                "video.mode",
                format!("unsupported video mode '{}' (expected device, webcam or file)", other),
            )),
        }
    }
}

/// Video pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoSettings {
    /// Source name as known by the automation server. Default empty.
    pub device_name: String,
    /// Driver identifier. Default empty.
    pub driver_id: String,
    /// Resolution such as `1920x1080`. Default empty.
    pub resolution: String,
    /// Ingestion mode. Default `device`.
    pub mode: VideoMode,
    /// Recorded video, required in file mode. Default none.
    pub file_path: Option<PathBuf>,
    /// Webcam index for webcam mode. Default none.
    pub webcam_index: Option<u32>,
    /// Loop recorded playback. Default `false`.
    pub loop_file: bool,
}

/// Test execution parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSettings {
    /// Detection model to load. Default empty.
    pub model_name: String,
    /// Automation server executable to launch. Default none.
    pub helper_executable: Option<PathBuf>,
    /// Directory for exported results. Default `./results`.
    pub output_dir: PathBuf,
    /// Signals sampled on every poll. Default empty.
    pub log_signals: Vec<String>,
    /// Reference trace to compare against. Default none.
    pub reference_file: Option<PathBuf>,
    /// Signal carrying the detected text for comparison. Default none.
    pub result_signal: Option<String>,
    /// Signal carrying the detection score for comparison. Default none.
    pub score_signal: Option<String>,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            model_name: String::new(),
            helper_executable: None,
            output_dir: PathBuf::from("./results"),
            log_signals: Vec::new(),
            reference_file: None,
            result_signal: None,
            score_signal: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Level name. Default `INFO`.
    pub level: String,
    /// Log file. Default `./logs/automation.log`.
    pub file: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: PathBuf::from("./logs/automation.log"),
        }
    }
}

impl Configuration {
    /// Build a configuration from a parsed document.
    pub fn from_document(doc: &Value) -> ConfigResult<Self> {
        let root = doc
            .as_map()
            .ok_or_else(|| ConfigError::invalid("configuration root must be a map"))?;

        for name in REQUIRED_SECTIONS {
            if !root.contains_key(name) {
                return Err(ConfigError::MissingSection(name.to_string()));
            }
        }

        let connection = Section::new("connection", &root["connection"])?;
        let dut = Section::new("deviceUnderTest", &root["deviceUnderTest"])?;
        let video = Section::new("video", &root["video"])?;
        let test = Section::new("test", &root["test"])?;
        let logging = Section::new("logging", &root["logging"])?;

        let defaults = ConnectionSettings::default();
        let port = connection.integer("port", i64::from(defaults.port))?;
        let port = u16::try_from(port).map_err(|_| {
            ConfigError::invalid_value("connection.port", format!("{} is not a valid port", port))
        })?;

        let timeout_ms = dut.integer("timeoutMs", DEFAULT_TIMEOUT_MS as i64)?;
        if timeout_ms < 0 {
            return Err(ConfigError::invalid_value(
                "deviceUnderTest.timeoutMs",
                "timeout must be greater than zero",
            ));
        }
        let timeout_ms = if timeout_ms == 0 {
            DEFAULT_TIMEOUT_MS
        } else {
            timeout_ms as u64
        };
        let parallel_instances = dut.integer("parallelInstances", 1)?;
        let parallel_instances = u32::try_from(parallel_instances).map_err(|_| {
            ConfigError::invalid_value(
                "deviceUnderTest.parallelInstances",
                format!("{} is out of range", parallel_instances),
            )
        })?;

        let webcam_index = match video.opt_integer("webcamIndex")? {
            Some(index) => Some(u32::try_from(index).map_err(|_| {
                let message = format!("{} is out of range", index);
                ConfigError::invalid_value("video.webcamIndex", message)
            })?),
            None => None,
        };

        Ok(Self {
            connection: ConnectionSettings {
                host: connection.string("host", &defaults.host),
                port,
            },
            device_under_test: DeviceUnderTestSettings {
                executable: PathBuf::from(dut.string("executable", "")),
                config_file: PathBuf::from(dut.string("configFile", "")),
                timeout_ms,
                parallel_instances,
            },
            video: VideoSettings {
                device_name: video.string("deviceName", ""),
                driver_id: video.string("driverId", ""),
                resolution: video.string("resolution", ""),
                mode: video.string("mode", "device").parse()?,
                file_path: video.opt_string("filePath").map(PathBuf::from),
                webcam_index,
                loop_file: video.boolean("loopFile", false)?,
            },
            test: TestSettings {
                model_name: test.string("modelName", ""),
                helper_executable: test
                    .opt_string("helperExecutable")
                    .map(|p| expand_home(Path::new(&p))),
                output_dir: PathBuf::from(test.string("outputDir", "./results")),
                log_signals: test.string_list("logSignals")?,
                reference_file: test.opt_string("referenceFile").map(PathBuf::from),
                result_signal: test.opt_string("resultSignal"),
                score_signal: test.opt_string("scoreSignal"),
            },
            logging: LoggingSettings {
                level: logging.string("level", "INFO"),
                file: PathBuf::from(logging.string("file", "./logs/automation.log")),
            },
        })
    }

    /// Effective RPC timeout in milliseconds (never zero).
    pub fn timeout_ms(&self) -> u64 {
        if self.device_under_test.timeout_ms == 0 {
            DEFAULT_TIMEOUT_MS
        } else {
            self.device_under_test.timeout_ms
        }
    }

    /// Deadline applied to each remote call and to the initial ready check.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms()).max(MIN_RPC_TIMEOUT)
    }

    /// Model host timeout, rounded up to whole seconds.
    pub fn model_host_timeout_secs(&self) -> i32 {
        let secs = self.timeout_ms().div_ceil(1000);
        i32::try_from(secs).unwrap_or(i32::MAX)
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Field accessor for one section of the document.
struct Section<'a> {
    name: &'static str,
    map: &'a BTreeMap<String, Value>,
}

impl<'a> Section<'a> {
    fn new(name: &'static str, value: &'a Value) -> ConfigResult<Self> {
        let map = value.as_map().ok_or_else(|| {
            let message = format!("expected a section, found {}", value.type_name());
            ConfigError::invalid_value(name, message)
        })?;
        Ok(Self { name, map })
    }

    fn field(&self, key: &str) -> String {
        format!("{}.{}", self.name, key)
    }

    /// Look up a key, treating empty strings and empty blocks as absent.
    fn get(&self, key: &str) -> Option<&'a Value> {
        match self.map.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::List(items) if items.is_empty() => None,
            Value::Map(map) if map.is_empty() => None,
            other => Some(other),
        }
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.opt_string(key).unwrap_or_else(|| default.to_string())
    }

    fn opt_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }

    fn integer(&self, key: &str, default: i64) -> ConfigResult<i64> {
        Ok(self.opt_integer(key)?.unwrap_or(default))
    }

    fn opt_integer(&self, key: &str) -> ConfigResult<Option<i64>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Integer(i) => Some(*i),
            Value::Float(x) if x.is_finite() => Some(x.trunc() as i64),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed.map(Some).ok_or_else(|| {
            let message = format!("expected an integer, found '{}'", value);
            ConfigError::invalid_value(self.field(key), message)
        })
    }

    fn boolean(&self, key: &str, default: bool) -> ConfigResult<bool> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Integer(i) => Ok(*i != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "yes" | "on" | "1" => Ok(true),
                "no" | "off" | "0" => Ok(false),
                _ => Err(ConfigError::invalid_value(
                    self.field(key),
                    format!("expected a boolean, found '{}'", s),
                )),
            },
            other => Err(ConfigError::invalid_value(
                self.field(key),
                format!("expected a boolean, found {}", other.type_name()),
            )),
        }
    }

    fn string_list(&self, key: &str) -> ConfigResult<Vec<String>> {
        let Some(value) = self.get(key) else {
            return Ok(Vec::new());
        };
        match value.as_list() {
            Some(items) => Ok(items.iter().map(|v| v.to_string()).collect()),
            None => Err(ConfigError::invalid_value(
                self.field(key),
                format!("expected a list, found {}", value.type_name()),
            )),
        }
    }
}
