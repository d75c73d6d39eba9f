use async_trait::async_trait;

use crate::harness::HarnessProgram;

use super::RunOutput;

/// Capability to run a harness program in isolation from the caller
///
/// Implementations decide where the program runs (a local process, a
/// container, a VM); the grader only sees the captured output. A process
/// that fails or misbehaves is reported through [`RunOutput::exit_error`],
/// while `Err` is reserved for failures of the executor itself.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run(&self, program: &HarnessProgram) -> anyhow::Result<RunOutput>;
}
