//! Top-level run: configuration, controller, export and comparison.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use aitest_core::compare;
use aitest_core::config::{self, Configuration, TestSettings};
use aitest_core::export::export_results;
use aitest_core::logging::{init_tracing, LogLevel, RunLogger};
use aitest_core::orchestrator::{CancelHandle, Controller, RunReport};
use aitest_core::rpc::RpcClient;
use anyhow::{Context, Result};

use crate::cli::Cli;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
    Interrupted,
}

impl RunStatus {
    /// Process exit status: 0 success, 1 handled failure, 2 user interrupt.
    pub fn code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failed => 1,
            RunStatus::Interrupted => 2,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Load the configuration and apply command-line overrides.
pub fn load_configuration(cli: &Cli) -> Result<Configuration> {
    let mut cfg = config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    cli.to_overrides().apply(&mut cfg);
    Ok(cfg)
}

/// Execute a full run and report how it ended.
pub fn execute(cli: &Cli) -> RunStatus {
    let cfg = match load_configuration(cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            let level = cli.log_level.as_deref().map(LogLevel::parse).unwrap_or_default();
            init_tracing(level);
            tracing::error!("{:#}", e);
            return RunStatus::Failed;
        }
    };

    let level = LogLevel::parse(&cfg.logging.level);
    init_tracing(level);

    match run_with_config(cli, cfg, level) {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("{:#}", e);
            RunStatus::Failed
        }
    }
}

fn run_with_config(cli: &Cli, cfg: Configuration, level: LogLevel) -> Result<RunStatus> {
    let logger = Arc::new(
        RunLogger::new(&cfg.logging.file, level)
            .with_context(|| format!("Failed to open log file {}", cfg.logging.file.display()))?,
    );

    let cancel = CancelHandle::new();
    let handler_cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_cancel.cancel()) {
        logger.warn(&format!("Could not install interrupt handler: {}", e));
    }

    logger.phase("Automated AI test");
    logger.info(&format!("Configuration: {}", cli.config.display()));
    logger.info(&format!("Endpoint: {}", cfg.connection.endpoint()));
    logger.info(&format!("Model: {}", cfg.test.model_name));

    let client = RpcClient::new(Arc::clone(&logger), cfg.rpc_timeout())
        .context("Failed to create RPC client")?;
    let test_settings = cfg.test.clone();
    let mut controller = Controller::new(cfg, Arc::clone(&logger), client, cancel);

    let report = match controller.run(&cli.run_options()) {
        Ok(report) => report,
        Err(e) if e.is_interrupted() => {
            logger.warn("Run interrupted by user");
            logger.flush();
            return Ok(RunStatus::Interrupted);
        }
        Err(e) => {
            logger.error(&format!("Run failed: {}", e));
            logger.flush();
            return Ok(RunStatus::Failed);
        }
    };

    logger.success(&format!(
        "Run finished with result {} ({} samples)",
        report.result.code,
        report.samples.len()
    ));

    let outcome = write_outputs(&report, &test_settings, &logger);
    logger.flush();
    outcome?;
    Ok(RunStatus::Success)
}

fn write_outputs(report: &RunReport, settings: &TestSettings, logger: &RunLogger) -> Result<()> {
    export_results(report, &settings.output_dir, logger).context("Failed to export results")?;

    if let Some(ref reference) = settings.reference_file {
        compare_with_reference(report, settings, reference, logger)?;
    }
    Ok(())
}

fn compare_with_reference(
    report: &RunReport,
    settings: &TestSettings,
    reference: &Path,
    logger: &RunLogger,
) -> Result<()> {
    let (Some(result_signal), Some(score_signal)) =
        (settings.result_signal.as_deref(), settings.score_signal.as_deref())
    else {
        logger.warn("Reference comparison needs test.resultSignal and test.scoreSignal; skipping");
        return Ok(());
    };

    let expected = compare::load_reference(reference, logger);
    let live = compare::live_frames(&report.samples, result_signal, score_signal);
    let rows = compare::compare(&live, &expected);
    compare::write_comparison(&rows, &settings.output_dir, logger)
        .context("Failed to write comparison report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    const CONFIG: &str = "\
connection:
  host: localhost
  port: 50051
deviceUnderTest:
  executable: ./ai_core
  configFile: ./ai_core.json
video:
  deviceName: Camera
test:
  modelName: IconDetection
logging:
  level: INFO
";

    #[test]
    fn exit_codes() {
        assert_eq!(RunStatus::Success.code(), 0);
        assert_eq!(RunStatus::Failed.code(), 1);
        assert_eq!(RunStatus::Interrupted.code(), 2);
    }

    #[test]
    fn overrides_apply_on_top_of_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, CONFIG).unwrap();

        let cli = Cli::try_parse_from([
            "automated-ai-test",
            "--config",
            path.to_str().unwrap(),
            "--host",
            "10.0.0.5",
            "--log-level",
            "DEBUG",
        ])
        .unwrap();

        let cfg = load_configuration(&cli).unwrap();
        assert_eq!(cfg.connection.endpoint(), "10.0.0.5:50051");
        assert_eq!(cfg.logging.level, "DEBUG");
        assert_eq!(cfg.test.model_name, "IconDetection");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let args = ["automated-ai-test", "--config", missing.to_str().unwrap()];
        let cli = Cli::try_parse_from(args).unwrap();

        let err = load_configuration(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("absent.yaml"));
    }
}
