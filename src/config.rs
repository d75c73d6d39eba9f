use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use serde::Deserialize;

/// Placeholder in `command` replaced with the harness file path
pub const INPUT_PLACEHOLDER: &str = "%INPUT%";

#[derive(Parser)]
#[command(name = "grader", version = "1.0", about, long_about = None)]
pub struct CliArgs {
    /// Path to the configuration file
    #[arg(long = "config", short = 'c')]
    pub config_path: String,

    /// Number of concurrent grading workers, overrides the configuration file
    #[arg(long = "workers", short = 'w')]
    pub workers: Option<usize>,
}

impl CliArgs {
    /// Load the configuration from the specified file and apply CLI overrides
    pub fn to_config(&self) -> anyhow::Result<Config> {
        let file = std::fs::File::open(&self.config_path)
            .with_context(|| format!("Failed to open config file {}", self.config_path))?;
        let reader = std::io::BufReader::new(file);
        let mut config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file {}", self.config_path))?;

        if let Some(workers) = self.workers {
            config.grader.workers = workers;
        }
        config.grader.validate()?;

        Ok(config)
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub grader: GraderConfig,
}

#[derive(Deserialize, Debug, Default)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct GraderConfig {
    /// Interpreter argv; `%INPUT%` is replaced with the harness file path
    pub command: Vec<String>,
    /// Where harness files live for the duration of one run
    pub scratch_dir: PathBuf,
    pub time_limit: MicroSecond,
    /// Number of grading runs allowed at once
    pub workers: usize,
    /// Submissions allowed to wait for a free worker
    pub max_pending: usize,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            command: vec!["python3".to_string(), INPUT_PLACEHOLDER.to_string()],
            scratch_dir: std::env::temp_dir(),
            time_limit: MicroSecond(10_000_000),
            workers: 4,
            max_pending: 64,
        }
    }
}

impl GraderConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.command.is_empty() {
            bail!("The interpreter command must not be empty");
        }
        if !self.command.iter().any(|arg| arg.contains(INPUT_PLACEHOLDER)) {
            bail!("The interpreter command must contain {INPUT_PLACEHOLDER}");
        }
        if self.workers == 0 {
            bail!("The number of workers must not be 0");
        }
        if self.time_limit.0 == 0 {
            bail!("The time limit must not be 0");
        }
        if self.max_pending == 0 {
            bail!("The pending queue capacity must not be 0");
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MicroSecond(pub u64);

impl From<MicroSecond> for Duration {
    fn from(value: MicroSecond) -> Self {
        Duration::from_micros(value.0)
    }
}
