//! Command-line interface.

use std::path::PathBuf;
use std::time::Duration;

use aitest_core::config::{ConfigOverrides, VideoMode};
use aitest_core::orchestrator::RunOptions;
use clap::Parser;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "automated-ai-test",
    version,
    about = "Drive an AI model test run on a remote automation server"
)]
pub struct Cli {
    /// Path to the run configuration file
    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Automation server host
    #[arg(long)]
    pub host: Option<String>,

    /// Automation server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Model to load and test
    #[arg(long)]
    pub model: Option<String>,

    /// Video capture device name
    #[arg(long)]
    pub video_source: Option<String>,

    /// Video capture driver identifier
    #[arg(long)]
    pub video_driver: Option<String>,

    /// Capture resolution, e.g. 1920x1080
    #[arg(long)]
    pub resolution: Option<String>,

    /// Video source kind: device, webcam or file
    #[arg(long, value_parser = parse_video_mode)]
    pub video_mode: Option<VideoMode>,

    /// Video file played in file mode
    #[arg(long)]
    pub video_file: Option<PathBuf>,

    /// Webcam index used in webcam mode
    #[arg(long)]
    pub webcam_index: Option<u32>,

    /// Loop the video file
    #[arg(long, conflicts_with = "no_loop_video")]
    pub loop_video: bool,

    /// Play the video file once
    #[arg(long)]
    pub no_loop_video: bool,

    /// Model host timeout in milliseconds (0 keeps the configured value)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Model host configuration file
    #[arg(long)]
    pub dut_config: Option<PathBuf>,

    /// Model host executable
    #[arg(long)]
    pub dut_executable: Option<PathBuf>,

    /// Directory for exported results
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Signal to record; repeat to record several (replaces the configured list)
    #[arg(long = "log-signal")]
    pub log_signals: Vec<String>,

    /// Log level: TRACE, DEBUG, INFO, WARNING or ERROR
    #[arg(long)]
    pub log_level: Option<String>,

    /// Automation server executable to launch
    #[arg(long)]
    pub helper_executable: Option<PathBuf>,

    /// Connect to an already running automation server
    #[arg(long)]
    pub skip_helper_launch: bool,

    /// Do not launch the model host executable
    #[arg(long)]
    pub skip_dut_launch: bool,

    /// Stop polling after this many seconds (0 waits for the run to end)
    #[arg(long)]
    pub monitor_seconds: Option<u64>,

    /// Seconds between signal polls
    #[arg(long, default_value = "0.5", value_parser = parse_interval)]
    pub poll_interval: Duration,

    /// Reference trace (JSON) to compare the detections against
    #[arg(long)]
    pub reference: Option<PathBuf>,
}

impl Cli {
    /// Configuration overrides given on the command line.
    pub fn to_overrides(&self) -> ConfigOverrides {
        let loop_video = if self.loop_video {
            Some(true)
        } else if self.no_loop_video {
            Some(false)
        } else {
            None
        };

        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            model_name: self.model.clone(),
            video_source: self.video_source.clone(),
            video_driver: self.video_driver.clone(),
            resolution: self.resolution.clone(),
            video_mode: self.video_mode,
            video_file: self.video_file.clone(),
            webcam_index: self.webcam_index,
            loop_video,
            timeout_ms: self.timeout,
            dut_config: self.dut_config.clone(),
            dut_executable: self.dut_executable.clone(),
            output_dir: self.output_dir.clone(),
            log_signals: self.log_signals.clone(),
            log_level: self.log_level.clone(),
            helper_executable: self.helper_executable.clone(),
            reference_file: self.reference.clone(),
        }
    }

    /// Options for the controller run.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            skip_helper_launch: self.skip_helper_launch,
            skip_model_host_launch: self.skip_dut_launch,
            max_duration: self.monitor_seconds.map(Duration::from_secs),
            poll_interval: self.poll_interval,
        }
    }
}

fn parse_video_mode(value: &str) -> Result<VideoMode, String> {
    value.parse().map_err(|e: aitest_core::config::ConfigError| e.to_string())
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(format!("poll interval must be positive, got {}", value));
    }
    Ok(Duration::from_secs_f64(seconds))
}
