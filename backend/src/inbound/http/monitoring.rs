//! Department monitoring views over the trailing 24 hours.
//!
//! ```text
//! GET /api/v1/monitoring/queue
//! GET /api/v1/monitoring/summary
//! ```

use actix_web::http::header;
use actix_web::{HttpResponse, get, web};

use crate::domain::Error;
use crate::domain::ports::{QueueSummary, VisitView};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Undischarged visits, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/monitoring/queue",
    responses(
        (status = 200, description = "Active queue", body = [VisitView]),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["monitoring"],
    operation_id = "activeQueue"
)]
#[get("/monitoring/queue")]
pub async fn active_queue(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let queue = state.visits_query.active_queue().await?;
    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(queue))
}

/// Visit counts per stage plus the total.
#[utoipa::path(
    get,
    path = "/api/v1/monitoring/summary",
    responses(
        (status = 200, description = "Stage counts", body = QueueSummary),
        (status = 503, description = "Store unavailable", body = Error)
    ),
    tags = ["monitoring"],
    operation_id = "queueSummary"
)]
#[get("/monitoring/summary")]
pub async fn summary(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let summary = state.visits_query.summary().await?;
    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(summary))
}
