use serde::{Deserialize, Serialize};

pub const ALL_PASSED: &str = "All test cases passed!";
pub const SOME_FAILED: &str = "Some test cases failed.";
pub const VALIDATION_FAILED: &str = "Code validation failed.";
pub const EXECUTION_FAILED: &str = "Execution failed.";
pub const RUNTIME_ERROR: &str = "Runtime error.";
pub const PARSE_FAILED: &str = "Failed to parse test results.";
pub const TIME_LIMIT_EXCEEDED: &str = "Time limit exceeded.";
pub const INTERNAL_ERROR: &str = "Internal error.";

/// Result of one test case, in the order the cases were run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub case: u32,
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
    /// milliseconds
    pub execution_time: f64,
}

/// The single result of one grading run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_results: Option<Vec<CaseOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub execution_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl Verdict {
    /// Builds the verdict for a run whose harness reported every case
    pub fn graded(outcomes: Vec<CaseOutcome>, message: Option<String>) -> Self {
        let success = outcomes.iter().all(|o| o.passed);
        let total: f64 = outcomes.iter().map(|o| o.execution_time).sum();

        Self {
            success,
            output: if success { ALL_PASSED } else { SOME_FAILED }.to_string(),
            test_results: Some(outcomes),
            execution_time: Some(format_duration(total)),
            message,
            error: None,
        }
    }

    /// Builds a hard-failure verdict without test results
    pub fn failure(output: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.to_string(),
            test_results: None,
            execution_time: None,
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

/// Formats an aggregate duration given in milliseconds
pub fn format_duration(millis: f64) -> String {
    format!("{millis:.3}ms")
}
