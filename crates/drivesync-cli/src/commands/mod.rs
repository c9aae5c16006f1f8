//! CLI subcommands

use std::path::PathBuf;
use std::process::ExitCode;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

pub mod config;
pub mod prompt;
pub mod pull;

/// Global options shared by every subcommand
#[derive(Debug, Clone)]
pub struct RunContext {
    pub format: OutputFormat,
    pub quiet: bool,
    /// Configuration file in effect (`--config` or the default path)
    pub config_path: PathBuf,
}

impl RunContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

pub(crate) fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
