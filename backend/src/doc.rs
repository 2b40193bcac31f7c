//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every handler in the inbound HTTP layer along with
//! the queue DTOs and the shared error envelope. The document backs Swagger
//! UI in debug builds and is exported by `cargo run --bin openapi-dump`.

use utoipa::OpenApi;

use crate::domain::ports::{EncodedTicket, QueueSummary, TicketValidation, VisitView};
use crate::domain::{Error, ErrorCode, VisitStage};
use crate::inbound::http::tickets::TicketBody;
use crate::inbound::http::visits::CreateVisitBody;

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "ED queue backend API",
        description = "Patient registration, ticket lookup, and queue monitoring for the emergency department.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::visits::create_visit,
        crate::inbound::http::visits::get_visit,
        crate::inbound::http::visits::advance_visit,
        crate::inbound::http::tickets::validate_ticket,
        crate::inbound::http::tickets::encode_ticket,
        crate::inbound::http::tickets::status,
        crate::inbound::http::monitoring::active_queue,
        crate::inbound::http::monitoring::summary,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        VisitView,
        VisitStage,
        CreateVisitBody,
        TicketBody,
        TicketValidation,
        EncodedTicket,
        QueueSummary,
        Error,
        ErrorCode
    )),
    tags(
        (name = "visits", description = "Registration and stage transitions"),
        (name = "tickets", description = "Ticket validation and public status lookup"),
        (name = "monitoring", description = "Live queue views for staff"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
