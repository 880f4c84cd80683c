//! Automated AI test runner.
//!
//! Usage:
//!   automated-ai-test --config config.yaml
//!   automated-ai-test --skip-helper-launch --monitor-seconds 60 --reference ref.json

mod cli;
mod run;

use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    let args = cli::Cli::parse();
    run::execute(&args).exit_code()
}
