use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify, oneshot};

use crate::verdict::Verdict;

/// A submission waiting for a free worker
pub struct GradeJob {
    pub id: u32,
    pub user_id: u32,
    pub code: String,
    pub responder: oneshot::Sender<Verdict>,
}

/// Bounded FIFO of pending submissions
pub struct JobQueue {
    queue: Mutex<VecDeque<GradeJob>>,
    notify: Notify,
    capacity: usize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Enqueues `job`, or hands it back if `capacity` jobs are already waiting
    pub async fn push(&self, job: GradeJob) -> Result<(), GradeJob> {
        {
            let mut queue = self.queue.lock().await;
            if queue.len() >= self.capacity {
                return Err(job);
            }
            queue.push_back(job);
        }
        self.notify.notify_one();
        Ok(())
    }

    pub async fn pop(&self) -> GradeJob {
        loop {
            if let Some(job) = self.queue.lock().await.pop_front() {
                return job;
            }
            self.notify.notified().await;
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }
}
