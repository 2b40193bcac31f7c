//! Ticket validation, token encoding, and public status lookup.
//!
//! ```text
//! POST /api/v1/tickets/validate
//! POST /api/v1/tickets/encode
//! GET  /api/v1/status?ticket=
//! ```
//!
//! Every lookup is limited to visits created in the trailing 24 hours.

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;
use crate::domain::ports::{EncodedTicket, TicketRequest, TicketValidation, VisitView};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, require_text};

const TICKET_CODE: FieldName = FieldName::new("ticketCode");
const TICKET: FieldName = FieldName::new("ticket");

/// Payload carrying a raw ticket code as typed by staff.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketBody {
    #[schema(example = "as-076")]
    pub ticket_code: Option<String>,
}

impl TryFrom<TicketBody> for TicketRequest {
    type Error = Error;

    fn try_from(body: TicketBody) -> Result<Self, Self::Error> {
        body.ticket_code
            .map(|ticket_code| Self { ticket_code })
            .ok_or_else(|| missing_field_error(TICKET_CODE))
    }
}

/// Query string of the public status lookup.
#[derive(Debug, Deserialize, IntoParams)]
pub struct StatusParams {
    /// Public token or raw ticket code.
    #[param(example = "Xk4RzQm9vb")]
    pub ticket: Option<String>,
}

/// Check that a ticket belongs to a visit of the trailing day.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/validate",
    request_body = TicketBody,
    responses(
        (status = 200, description = "Ticket is valid", body = TicketValidation),
        (status = 400, description = "Missing ticket code", body = Error),
        (status = 404, description = "Ticket not found or expired", body = Error)
    ),
    tags = ["tickets"],
    operation_id = "validateTicket"
)]
#[post("/tickets/validate")]
pub async fn validate_ticket(
    state: web::Data<HttpState>,
    payload: web::Json<TicketBody>,
) -> ApiResult<web::Json<TicketValidation>> {
    let request = TicketRequest::try_from(payload.into_inner())?;
    let validation = state.visits_query.validate_ticket(request).await?;
    Ok(web::Json(validation))
}

/// Produce the public token for a ticket that is still resolvable.
#[utoipa::path(
    post,
    path = "/api/v1/tickets/encode",
    request_body = TicketBody,
    responses(
        (status = 200, description = "Ticket token", body = EncodedTicket),
        (status = 400, description = "Missing ticket code", body = Error),
        (status = 404, description = "Ticket not found or expired", body = Error)
    ),
    tags = ["tickets"],
    operation_id = "encodeTicket"
)]
#[post("/tickets/encode")]
pub async fn encode_ticket(
    state: web::Data<HttpState>,
    payload: web::Json<TicketBody>,
) -> ApiResult<web::Json<EncodedTicket>> {
    let request = TicketRequest::try_from(payload.into_inner())?;
    let encoded = state.visits_query.encode_ticket(request).await?;
    Ok(web::Json(encoded))
}

/// Resolve a public token or raw ticket code to its visit.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    params(StatusParams),
    responses(
        (status = 200, description = "Visit status", body = VisitView),
        (status = 400, description = "Missing ticket", body = Error),
        (status = 404, description = "Ticket not found or expired", body = Error)
    ),
    tags = ["tickets"],
    operation_id = "ticketStatus"
)]
#[get("/status")]
pub async fn status(
    state: web::Data<HttpState>,
    params: web::Query<StatusParams>,
) -> ApiResult<web::Json<VisitView>> {
    let ticket = require_text(params.into_inner().ticket, TICKET)?;
    let view = state.visits_query.status(ticket).await?;
    Ok(web::Json(view))
}
