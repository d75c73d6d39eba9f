use std::sync::Arc;

use crate::config::GraderConfig;
use crate::harness;
use crate::interpret::interpret;
use crate::problem::{Problem, TWO_SUM};
use crate::sandbox::{Executor, create_executor};
use crate::verdict::{self, Verdict};

/// Entry point of the grading pipeline
///
/// A `Grader` holds no per-run state, so one instance can serve any number
/// of concurrent `grade` calls. Bounding how many run at once is up to the
/// caller (see [`crate::queue::JobQueue`]).
#[derive(Clone)]
pub struct Grader {
    executor: Arc<dyn Executor>,
    problem: &'static Problem,
}

impl Grader {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::with_problem(executor, &TWO_SUM)
    }

    pub fn with_problem(executor: Arc<dyn Executor>, problem: &'static Problem) -> Self {
        Self { executor, problem }
    }

    pub fn from_config(config: &GraderConfig) -> Self {
        Self::new(create_executor(config))
    }

    /// Grades one submission
    ///
    /// Always returns a verdict: invalid code, a crashing interpreter, garbage
    /// output and even a panic inside the pipeline all come back as a failed
    /// verdict with `error` filled in.
    pub async fn grade(&self, code: &str) -> Verdict {
        let code = code.to_string();
        let executor = Arc::clone(&self.executor);
        let problem = self.problem;

        let handle =
            tokio::spawn(async move { run_pipeline(&code, problem, executor.as_ref()).await });

        match handle.await {
            Ok(verdict) => verdict,
            Err(e) => {
                log::error!("Grading task failed: {e}");
                Verdict::failure(verdict::INTERNAL_ERROR, format!("internal error: {e}"))
            }
        }
    }
}

async fn run_pipeline(code: &str, problem: &Problem, executor: &dyn Executor) -> Verdict {
    // Step 1: Validate and build the harness
    let program = match harness::synthesize(code, problem) {
        Ok(program) => program,
        Err(e) => {
            log::debug!("Submission rejected: {e}");
            return Verdict::failure(verdict::VALIDATION_FAILED, e.to_string());
        }
    };
    let message = program.message().map(str::to_string);

    // Step 2: Run it
    let output = match executor.run(&program).await {
        Ok(output) => output,
        Err(e) => {
            log::error!("Executor failed: {e:#}");
            return Verdict::failure(verdict::INTERNAL_ERROR, format!("{e:#}"))
                .with_message(message);
        }
    };

    // Step 3: Interpret what it printed
    interpret(output, problem.cases.len(), message)
}
