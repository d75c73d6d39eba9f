mod executor;
mod process_runner;

// Re-export the trait and common types
pub use executor::Executor;
pub use process_runner::ProcessRunner;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::GraderConfig;

/// Why a harness process did not finish cleanly
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExitError {
    #[error("failed to launch interpreter: {0}")]
    LaunchFailed(String),
    #[error("interpreter {}", describe_exit(.code))]
    NonZeroExit { code: Option<i32> },
    #[error("execution timed out after {} ms", .0.as_millis())]
    TimedOut(Duration),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// Everything observable about one run of a harness program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_error: Option<ExitError>,
}

impl RunOutput {
    pub fn launch_failed(reason: impl Into<String>) -> Self {
        Self {
            exit_error: Some(ExitError::LaunchFailed(reason.into())),
            ..Default::default()
        }
    }
}

/// Creates the executor the grading service runs harness programs with
///
/// Only process isolation is available: the harness runs as a fresh
/// interpreter process with no memory, filesystem or network restrictions.
pub fn create_executor(config: &GraderConfig) -> Arc<dyn Executor> {
    log::info!(
        "Creating ProcessRunner (command: {:?}, scratch: {})",
        config.command,
        config.scratch_dir.display()
    );
    log::warn!("ProcessRunner provides NO resource isolation - use only in trusted environments");
    Arc::new(ProcessRunner::new(config))
}
