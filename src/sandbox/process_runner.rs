use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::{GraderConfig, INPUT_PLACEHOLDER};
use crate::harness::HarnessProgram;

use super::{Executor, ExitError, RunOutput};

/// Runs each harness program as a fresh interpreter process
///
/// The program is written to a uniquely named file in the scratch directory,
/// the interpreter is pointed at it, and the file is removed as soon as the
/// process is gone. Only a wall-clock limit is enforced.
pub struct ProcessRunner {
    /// Interpreter argv template
    command: Vec<String>,
    scratch_dir: PathBuf,
    time_limit: Duration,
}

#[async_trait]
impl Executor for ProcessRunner {
    async fn run(&self, program: &HarnessProgram) -> Result<RunOutput> {
        let scratch = ScratchFile::create(&self.scratch_dir, program.source()).await?;
        let command = self.generate_run_command(&scratch.path().to_string_lossy());

        let output = self.execute(&command).await;

        settle_cleanup(output, scratch.remove().await)
    }
}

/// Combines a run with the outcome of removing its harness file
///
/// A cleanup error only surfaces when the run itself went fine; otherwise the
/// execution failure is kept and the cleanup error is logged.
fn settle_cleanup(output: RunOutput, cleanup: std::io::Result<()>) -> Result<RunOutput> {
    match cleanup {
        Ok(()) => Ok(output),
        Err(e) if output.exit_error.is_some() => {
            log::error!("Failed to remove harness file: {e}");
            Ok(output)
        }
        Err(e) => Err(e).context("Failed to remove harness file"),
    }
}

impl ProcessRunner {
    pub fn new(config: &GraderConfig) -> Self {
        Self {
            command: config.command.clone(),
            scratch_dir: config.scratch_dir.clone(),
            time_limit: config.time_limit.into(),
        }
    }

    /// Generates the run command by applying template substitutions
    fn generate_run_command(&self, harness_path: &str) -> Vec<String> {
        let mut mapping = HashMap::<&str, &str>::new();
        mapping.insert(INPUT_PLACEHOLDER, harness_path);

        self.command
            .iter()
            .map(|s| {
                let mut t = s.clone();
                for (k, v) in mapping.iter() {
                    t = t.replace(k, v);
                }
                t
            })
            .collect()
    }

    /// Executes the interpreter and captures both output streams
    async fn execute(&self, command: &[String]) -> RunOutput {
        let Some((program, args)) = command.split_first() else {
            return RunOutput::launch_failed("empty interpreter command");
        };
        log::debug!("Spawning {command:?}");

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return RunOutput::launch_failed(format!("{program}: {e}")),
        };

        let start_time = Instant::now();
        // On timeout the child is dropped, which kills it
        let execution_result = timeout(self.time_limit, child.wait_with_output()).await;
        log::debug!("Interpreter finished after {:?}", start_time.elapsed());

        match execution_result {
            Ok(Ok(output)) => {
                let exit_error = (!output.status.success()).then(|| ExitError::NonZeroExit {
                    code: output.status.code(),
                });
                RunOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_error,
                }
            }
            Ok(Err(e)) => RunOutput::launch_failed(format!("failed to wait for {program}: {e}")),
            Err(_) => {
                log::warn!("Interpreter killed after exceeding {:?}", self.time_limit);
                RunOutput {
                    exit_error: Some(ExitError::TimedOut(self.time_limit)),
                    ..Default::default()
                }
            }
        }
    }
}

/// A harness file that lives for exactly one run
///
/// Dropping it without calling [`ScratchFile::remove`] still deletes the file,
/// which covers cancelled and panicking runs.
struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    async fn create(dir: &Path, contents: &str) -> Result<Self> {
        let path = dir.join(format!("harness-{}.py", Uuid::new_v4()));
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to create harness file {}", path.display()))?;
        let scratch = Self {
            path,
            removed: false,
        };

        file.write_all(contents.as_bytes())
            .await
            .context("Failed to write harness file")?;
        file.flush().await.context("Failed to flush harness file")?;
        log::debug!("Wrote harness file {}", scratch.path.display());

        Ok(scratch)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn remove(mut self) -> std::io::Result<()> {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                log::error!("Failed to remove harness file {}: {e}", self.path.display())
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MicroSecond;

    fn runner(command: &[&str], scratch_dir: &Path, time_limit: Duration) -> ProcessRunner {
        ProcessRunner::new(&GraderConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            scratch_dir: scratch_dir.to_path_buf(),
            time_limit: MicroSecond(time_limit.as_micros() as u64),
            ..Default::default()
        })
    }

    fn shell_runner(scratch_dir: &Path) -> ProcessRunner {
        runner(&["sh", "%INPUT%"], scratch_dir, Duration::from_secs(10))
    }

    fn assert_empty(dir: &Path) {
        let leftover: Vec<_> = std::fs::read_dir(dir).unwrap().collect();
        assert!(leftover.is_empty(), "scratch dir not empty: {leftover:?}");
    }

    #[test]
    fn test_generate_run_command() {
        let runner = runner(
            &["python3", "-u", "%INPUT%"],
            Path::new("/tmp"),
            Duration::from_secs(1),
        );
        assert_eq!(
            runner.generate_run_command("/tmp/harness-x.py"),
            vec!["python3", "-u", "/tmp/harness-x.py"]
        );
    }

    #[tokio::test]
    async fn test_captures_stdout_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = HarnessProgram::from_source("echo hello\necho oops >&2\n");

        let output = shell_runner(dir.path()).run(&program).await.unwrap();

        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
        assert_eq!(output.exit_error, None);
        assert_empty(dir.path());
    }

    #[tokio::test]
    async fn test_program_is_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = "cat \"$0\"\n";
        let program = HarnessProgram::from_source(source);

        let output = shell_runner(dir.path()).run(&program).await.unwrap();

        assert_eq!(output.stdout, source);
        assert_empty(dir.path());
    }

    #[tokio::test]
    async fn test_concurrent_runs_use_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let runner = shell_runner(dir.path());
        let program = HarnessProgram::from_source("echo \"$0\"\n");

        let (a, b) = tokio::join!(runner.run(&program), runner.run(&program));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.stdout.contains("harness-"));
        assert_ne!(a.stdout, b.stdout);
        assert_empty(dir.path());
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let program = HarnessProgram::from_source("echo partial\nexit 3\n");

        let output = shell_runner(dir.path()).run(&program).await.unwrap();

        assert_eq!(output.stdout, "partial\n");
        assert_eq!(output.exit_error, Some(ExitError::NonZeroExit { code: Some(3) }));
        assert_empty(dir.path());
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(
            &["definitely-not-an-interpreter-7f3a", "%INPUT%"],
            dir.path(),
            Duration::from_secs(1),
        );

        let output = runner.run(&HarnessProgram::from_source("")).await.unwrap();

        assert!(matches!(output.exit_error, Some(ExitError::LaunchFailed(_))));
        assert!(output.stdout.is_empty());
        assert_empty(dir.path());
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(&["sh", "%INPUT%"], dir.path(), Duration::from_millis(200));

        let start = Instant::now();
        let output = runner
            .run(&HarnessProgram::from_source("sleep 5\n"))
            .await
            .unwrap();

        assert_eq!(
            output.exit_error,
            Some(ExitError::TimedOut(Duration::from_millis(200)))
        );
        assert!(start.elapsed() < Duration::from_secs(4));
        assert_empty(dir.path());
    }

    #[tokio::test]
    async fn test_program_that_deletes_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let program = HarnessProgram::from_source("rm \"$0\"\necho hi\n");

        let output = shell_runner(dir.path()).run(&program).await.unwrap();

        assert_eq!(output.stdout, "hi\n");
        assert_eq!(output.exit_error, None);
        assert_empty(dir.path());
    }

    #[tokio::test]
    async fn test_failing_program_that_deletes_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let program = HarnessProgram::from_source("rm \"$0\"\nexit 3\n");

        let output = shell_runner(dir.path()).run(&program).await.unwrap();

        assert_eq!(output.exit_error, Some(ExitError::NonZeroExit { code: Some(3) }));
        assert_empty(dir.path());
    }

    #[test]
    fn test_cleanup_error_after_successful_run() {
        let output = RunOutput {
            stdout: "hi\n".to_string(),
            ..Default::default()
        };
        let cleanup = Err(std::io::Error::from(ErrorKind::PermissionDenied));

        let err = settle_cleanup(output, cleanup).unwrap_err();

        assert!(err.to_string().contains("Failed to remove harness file"));
    }

    #[test]
    fn test_cleanup_error_keeps_execution_failure() {
        let output = RunOutput {
            stderr: "boom\n".to_string(),
            exit_error: Some(ExitError::NonZeroExit { code: Some(1) }),
            ..Default::default()
        };
        let cleanup = Err(std::io::Error::from(ErrorKind::PermissionDenied));

        let settled = settle_cleanup(output.clone(), cleanup).unwrap();

        assert_eq!(settled, output);
    }

    #[tokio::test]
    async fn test_missing_scratch_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let result = shell_runner(&missing)
            .run(&HarnessProgram::from_source("echo hi\n"))
            .await;

        assert!(result.is_err());
    }
}
