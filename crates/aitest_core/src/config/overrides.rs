//! Command-line overrides applied on top of a loaded configuration.

use std::path::PathBuf;

use super::settings::{expand_home, Configuration, VideoMode};

/// Explicitly supplied overrides.
///
/// Every field is optional; only fields that are set replace the loaded
/// value. Overrides are applied once at startup, before the configuration
/// is handed to the controller.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model_name: Option<String>,
    pub video_source: Option<String>,
    pub video_driver: Option<String>,
    pub resolution: Option<String>,
    pub video_mode: Option<VideoMode>,
    pub video_file: Option<PathBuf>,
    pub webcam_index: Option<u32>,
    pub loop_video: Option<bool>,
    /// RPC timeout in milliseconds; zero is ignored.
    pub timeout_ms: Option<u64>,
    pub dut_config: Option<PathBuf>,
    pub dut_executable: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    /// Replaces the configured signal list when non-empty.
    pub log_signals: Vec<String>,
    pub log_level: Option<String>,
    pub helper_executable: Option<PathBuf>,
    pub reference_file: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Apply every supplied override to `config`.
    pub fn apply(&self, config: &mut Configuration) {
        if let Some(ref host) = self.host {
            config.connection.host = host.clone();
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(ref model) = self.model_name {
            config.test.model_name = model.clone();
        }
        if let Some(ref source) = self.video_source {
            config.video.device_name = source.clone();
        }
        if let Some(ref driver) = self.video_driver {
            config.video.driver_id = driver.clone();
        }
        if let Some(ref resolution) = self.resolution {
            config.video.resolution = resolution.clone();
        }
        if let Some(mode) = self.video_mode {
            config.video.mode = mode;
        }
        if let Some(ref file) = self.video_file {
            config.video.file_path = Some(file.clone());
        }
        if let Some(index) = self.webcam_index {
            config.video.webcam_index = Some(index);
        }
        if let Some(loop_file) = self.loop_video {
            config.video.loop_file = loop_file;
        }
        if let Some(timeout) = self.timeout_ms.filter(|t| *t > 0) {
            config.device_under_test.timeout_ms = timeout;
        }
        if let Some(ref path) = self.dut_config {
            config.device_under_test.config_file = path.clone();
        }
        if let Some(ref path) = self.dut_executable {
            config.device_under_test.executable = path.clone();
        }
        if let Some(ref dir) = self.output_dir {
            config.test.output_dir = dir.clone();
        }
        if !self.log_signals.is_empty() {
            config.test.log_signals = self.log_signals.clone();
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(ref path) = self.helper_executable {
            config.test.helper_executable = Some(expand_home(path));
        }
        if let Some(ref path) = self.reference_file {
            config.test.reference_file = Some(path.clone());
        }
    }
}
