use serde::Deserialize;
use thiserror::Error;

use crate::sandbox::{ExitError, RunOutput};
use crate::verdict::{self, CaseOutcome, Verdict};

/// Harness output that cannot be turned into case outcomes
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpretError {
    #[error("failed to parse harness output: {reason}; raw output: {raw:?}")]
    Malformed { reason: String, raw: String },
    #[error("expected {expected} test results, got {found}; raw output: {raw:?}")]
    CaseCountMismatch {
        expected: usize,
        found: usize,
        raw: String,
    },
}

/// What the harness reported on its single output line
#[derive(Debug, Clone, PartialEq)]
pub enum HarnessReport {
    Completed(Vec<CaseOutcome>),
    /// The submission raised while running a case; no outcomes were kept
    Raised(String),
}

/// The harness may serialize `passed` either way
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum PassedFlag {
    Bool(bool),
    Text(String),
}

impl From<PassedFlag> for bool {
    fn from(flag: PassedFlag) -> Self {
        match flag {
            PassedFlag::Bool(b) => b,
            PassedFlag::Text(s) => s == "true",
        }
    }
}

#[derive(Deserialize, Debug)]
struct RawCaseOutcome {
    case: u32,
    #[serde(default)]
    input: String,
    expected: String,
    actual: String,
    passed: PassedFlag,
    #[serde(default)]
    execution_time: Option<f64>,
}

impl From<RawCaseOutcome> for CaseOutcome {
    fn from(raw: RawCaseOutcome) -> Self {
        Self {
            case: raw.case,
            input: raw.input,
            expected: raw.expected,
            actual: raw.actual,
            passed: raw.passed.into(),
            execution_time: raw.execution_time.unwrap_or(0.0),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum HarnessRecord {
    Error { error: String },
    Case(RawCaseOutcome),
}

/// Turns a finished run into a verdict
///
/// `message` is the synthesizer's informational note and is carried onto
/// whatever verdict comes out.
pub fn interpret(output: RunOutput, expected_cases: usize, message: Option<String>) -> Verdict {
    let RunOutput {
        stdout,
        stderr,
        exit_error,
    } = output;

    let verdict = if let Some(exit_error) = exit_error {
        let summary = match exit_error {
            ExitError::TimedOut(_) => verdict::TIME_LIMIT_EXCEEDED,
            ExitError::LaunchFailed(_) | ExitError::NonZeroExit { .. } => {
                verdict::EXECUTION_FAILED
            }
        };
        let error = if stderr.trim().is_empty() {
            exit_error.to_string()
        } else {
            stderr
        };
        Verdict::failure(summary, error)
    } else if !stderr.trim().is_empty() {
        // Anything on stderr fails the run even when the interpreter exited cleanly
        log::debug!("Harness wrote to stderr: {stderr}");
        Verdict::failure(verdict::EXECUTION_FAILED, stderr)
    } else {
        match parse_report(&stdout, expected_cases) {
            Ok(HarnessReport::Completed(outcomes)) => Verdict::graded(outcomes, None),
            Ok(HarnessReport::Raised(error)) => Verdict::failure(verdict::RUNTIME_ERROR, error),
            Err(e) => Verdict::failure(verdict::PARSE_FAILED, e.to_string()),
        }
    };

    verdict.with_message(message)
}

/// Parses the last non-empty line of `stdout` as the harness payload
///
/// Earlier lines belong to the submission's own prints and are ignored.
pub fn parse_report(stdout: &str, expected_cases: usize) -> Result<HarnessReport, InterpretError> {
    let Some(line) = stdout.lines().rev().find(|l| !l.trim().is_empty()) else {
        return Err(InterpretError::Malformed {
            reason: "no output".to_string(),
            raw: stdout.to_string(),
        });
    };

    let records: Vec<HarnessRecord> =
        serde_json::from_str(line).map_err(|e| InterpretError::Malformed {
            reason: e.to_string(),
            raw: stdout.to_string(),
        })?;

    let mut outcomes = Vec::with_capacity(records.len());
    for record in records {
        match record {
            HarnessRecord::Error { error } => return Ok(HarnessReport::Raised(error)),
            HarnessRecord::Case(raw) => outcomes.push(CaseOutcome::from(raw)),
        }
    }

    if outcomes.len() != expected_cases {
        return Err(InterpretError::CaseCountMismatch {
            expected: expected_cases,
            found: outcomes.len(),
            raw: stdout.to_string(),
        });
    }

    Ok(HarnessReport::Completed(outcomes))
}
