//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::VisitStage;
use crate::domain::ports::{
    FixtureVisitCommand, FixtureVisitQuery, MockVisitCommand, MockVisitQuery, VisitCommand,
    VisitQuery, VisitView,
};
use crate::inbound::http::state::HttpState;

/// Build an app exposing every API route under `/api/v1`.
pub fn test_app(
    visits: Arc<dyn VisitCommand>,
    visits_query: Arc<dyn VisitQuery>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(HttpState::new(visits, visits_query)))
        .service(web::scope("/api/v1").configure(super::configure_api))
}

/// App whose commands are mocked and whose queries use the fixture.
pub fn command_app(
    command: MockVisitCommand,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    test_app(Arc::new(command), Arc::new(FixtureVisitQuery))
}

/// App whose queries are mocked and whose commands use the fixture.
pub fn query_app(
    query: MockVisitQuery,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    test_app(Arc::new(FixtureVisitCommand), Arc::new(query))
}

pub fn registered_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Visit view with stable sample values.
pub fn sample_view(ticket_code: &str, stage: VisitStage) -> VisitView {
    VisitView {
        id: Uuid::from_u128(0x7),
        ticket_code: ticket_code.to_owned(),
        stage,
        complaint: Some("fever".to_owned()),
        created_at: registered_at(),
        updated_at: registered_at(),
        patient_id: Uuid::from_u128(0x1),
        patient_name: "Asep Sunandar".to_owned(),
        guardian_name: "Euis".to_owned(),
        guardian_phone: "081234567890".to_owned(),
    }
}
