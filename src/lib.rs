pub mod config;
pub mod grader;
pub mod harness;
pub mod interpret;
pub mod problem;
pub mod queue;
pub mod routes;
pub mod sandbox;
pub mod verdict;
pub mod web_server;
pub mod worker;

pub use grader::Grader;
pub use verdict::{CaseOutcome, Verdict};

pub fn create_timestamp() -> String {
    use chrono::{SecondsFormat, Utc};
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
