mod grade;

pub use grade::*;

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{HttpRequest, HttpResponse, Responder, post};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub reason: String,
    pub code: u32,
}

impl ErrorResponse {
    pub fn new(reason: &str, code: u32) -> Self {
        Self {
            reason: reason.to_string(),
            code,
        }
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorResponse::new("ERR_INVALID_ARGUMENT", 1));
    InternalError::from_response(err, response).into()
}

/// NOTE: DO NOT REMOVE: used in automatic testing
#[post("/internal/exit")]
#[allow(unreachable_code)]
pub async fn exit() -> impl Responder {
    log::info!("Shutdown as requested");
    std::process::exit(0);
    "Exited".to_string()
}
