use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::grader::Grader;
use crate::queue::{GradeJob, JobQueue};

/// Pulls submissions off `queue` and grades them one at a time
///
/// Running N of these bounds the number of live interpreter processes to N.
pub async fn worker(id: usize, grader: Grader, queue: Arc<JobQueue>, token: CancellationToken) {
    log::info!("Worker {id} initialized");

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                log::info!("Worker {id} received shutdown signal, stopping");
                break;
            }

            job = queue.pop() => {
                let GradeJob { id: job_id, user_id, code, responder } = job;
                log::info!("Worker {id} got job {job_id} (user {user_id}) from queue");

                let verdict = grader.grade(&code).await;
                log::info!(
                    "Job {job_id} finished on worker {id}: success={}, time={}",
                    verdict.success,
                    verdict.execution_time.as_deref().unwrap_or("-")
                );

                if responder.send(verdict).is_err() {
                    log::warn!("Failed to send job {job_id} result back to server");
                }
            }
        };
    }

    log::info!("Worker {id} has shut down gracefully");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::HarnessProgram;
    use crate::sandbox::{Executor, RunOutput};
    use async_trait::async_trait;
    use tokio::sync::oneshot;

    struct FixedExecutor(&'static str);

    #[async_trait]
    impl Executor for FixedExecutor {
        async fn run(&self, _program: &HarnessProgram) -> anyhow::Result<RunOutput> {
            Ok(RunOutput {
                stdout: self.0.to_string(),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_worker_answers_and_stops() {
        let grader = Grader::new(Arc::new(FixedExecutor(r#"[{"error": "ValueError: nope"}]"#)));
        let queue = Arc::new(JobQueue::new(4));
        let token = CancellationToken::new();
        let handle = tokio::spawn(worker(1, grader, queue.clone(), token.clone()));

        let (responder, rx) = oneshot::channel();
        let pushed = queue
            .push(GradeJob {
                id: 1,
                user_id: 3,
                code: "def two_sum(a, b):\n    return a\n".to_string(),
                responder,
            })
            .await;
        assert!(pushed.is_ok());

        let verdict = rx.await.unwrap();
        assert!(!verdict.success);
        assert_eq!(verdict.error.as_deref(), Some("ValueError: nope"));

        token.cancel();
        handle.await.unwrap();
    }
}
