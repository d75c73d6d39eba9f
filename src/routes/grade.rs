use std::sync::atomic::{AtomicU32, Ordering};

use actix_web::{HttpResponse, Responder, post, web};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::ErrorResponse;
use crate::create_timestamp;
use crate::queue::{GradeJob, JobQueue};
use crate::verdict::Verdict;

#[derive(Serialize, Deserialize, Debug)]
pub struct GradeRequest {
    pub user_id: u32,
    pub code: String,
}

/// Response body: the verdict plus bookkeeping for the calling layer
#[derive(Serialize, Deserialize, Debug)]
pub struct GradeRecord {
    pub id: u32,
    pub user_id: u32,
    pub created_time: String,
    pub updated_time: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

/// Hands out job ids for log correlation; ids are not persisted
#[derive(Default)]
pub struct JobCounter(AtomicU32);

impl JobCounter {
    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[post("/grade")]
pub async fn post_grade_handler(
    job_queue: web::Data<JobQueue>,
    counter: web::Data<JobCounter>,
    body: web::Json<GradeRequest>,
) -> impl Responder {
    let GradeRequest { user_id, code } = body.into_inner();
    let job_id = counter.next();
    let created_time = create_timestamp();

    let (tx, rx) = oneshot::channel::<Verdict>();
    let job = GradeJob {
        id: job_id,
        user_id,
        code,
        responder: tx,
    };

    if job_queue.push(job).await.is_err() {
        log::warn!("Queue is full, rejected job {job_id} from user {user_id}");
        return HttpResponse::ServiceUnavailable().json(ErrorResponse::new("ERR_BUSY", 7));
    }
    log::debug!("Sent job {job_id} to queue");

    match rx.await {
        Ok(verdict) => HttpResponse::Ok().json(GradeRecord {
            id: job_id,
            user_id,
            created_time,
            updated_time: create_timestamp(),
            verdict,
        }),
        Err(e) => {
            log::error!("Failed to receive result of job {job_id}: {e}");
            HttpResponse::InternalServerError().json(ErrorResponse::new("ERR_INTERNAL", 6))
        }
    }
}
