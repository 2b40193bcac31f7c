//! Visit registration and workflow handlers.
//!
//! ```text
//! POST /api/v1/visits
//! GET  /api/v1/visits/{id}
//! POST /api/v1/visits/{id}/advance
//! ```

use actix_web::http::header;
use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::{AdvanceVisitRequest, CreateVisitRequest, VisitView};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_uuid};

const PATIENT_NAME: FieldName = FieldName::new("patientName");
const GUARDIAN_NAME: FieldName = FieldName::new("guardianName");
const GUARDIAN_PHONE: FieldName = FieldName::new("guardianPhone");
const VISIT_ID: FieldName = FieldName::new("visitId");

/// Registration payload. Blank values are rejected by the domain.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisitBody {
    #[schema(example = "Asep Sunandar")]
    pub patient_name: Option<String>,
    #[schema(example = "Euis Sunandar")]
    pub guardian_name: Option<String>,
    #[schema(example = "0812-3456-7890")]
    pub guardian_phone: Option<String>,
    #[schema(example = "high fever since last night")]
    pub complaint: Option<String>,
}

impl TryFrom<CreateVisitBody> for CreateVisitRequest {
    type Error = Error;

    fn try_from(body: CreateVisitBody) -> Result<Self, Self::Error> {
        Ok(Self {
            patient_name: body
                .patient_name
                .ok_or_else(|| missing_field_error(PATIENT_NAME))?,
            guardian_name: body
                .guardian_name
                .ok_or_else(|| missing_field_error(GUARDIAN_NAME))?,
            guardian_phone: body
                .guardian_phone
                .ok_or_else(|| missing_field_error(GUARDIAN_PHONE))?,
            complaint: body.complaint,
        })
    }
}

/// Register a patient and open a visit with a freshly issued ticket.
#[utoipa::path(
    post,
    path = "/api/v1/visits",
    request_body = CreateVisitBody,
    responses(
        (status = 201, description = "Visit created", body = VisitView),
        (status = 400, description = "Invalid registration", body = Error),
        (status = 503, description = "Ticket contention or store outage", body = Error)
    ),
    tags = ["visits"],
    operation_id = "createVisit"
)]
#[post("/visits")]
pub async fn create_visit(
    state: web::Data<HttpState>,
    payload: web::Json<CreateVisitBody>,
) -> ApiResult<HttpResponse> {
    let request = CreateVisitRequest::try_from(payload.into_inner())?;
    let view = state.visits.create_visit(request).await?;
    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/api/v1/visits/{}", view.id)))
        .json(view))
}

/// Fetch one visit merged with its patient.
#[utoipa::path(
    get,
    path = "/api/v1/visits/{id}",
    params(("id" = String, Path, description = "Visit identifier")),
    responses(
        (status = 200, description = "Visit", body = VisitView),
        (status = 400, description = "Malformed identifier", body = Error),
        (status = 404, description = "Unknown visit", body = Error)
    ),
    tags = ["visits"],
    operation_id = "getVisit"
)]
#[get("/visits/{id}")]
pub async fn get_visit(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<VisitView>> {
    let visit_id = parse_uuid(&path.into_inner(), VISIT_ID)?;
    let view = state.visits_query.get_visit(visit_id).await?;
    Ok(web::Json(view))
}

/// Advance a visit to the next workflow stage.
#[utoipa::path(
    post,
    path = "/api/v1/visits/{id}/advance",
    params(("id" = String, Path, description = "Visit identifier")),
    responses(
        (status = 200, description = "Visit after advancing", body = VisitView),
        (status = 404, description = "Unknown visit", body = Error),
        (status = 409, description = "Already discharged or changed concurrently", body = Error)
    ),
    tags = ["visits"],
    operation_id = "advanceVisit"
)]
#[post("/visits/{id}/advance")]
pub async fn advance_visit(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<VisitView>> {
    let visit_id = parse_uuid(&path.into_inner(), VISIT_ID)?;
    let view = state
        .visits
        .advance_visit(AdvanceVisitRequest { visit_id })
        .await?;
    Ok(web::Json(view))
}

#[cfg(test)]
#[path = "visits_tests.rs"]
mod tests;
