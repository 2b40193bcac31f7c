//! End-to-end queue flow over the in-memory adapters.
//!
//! Drives the HTTP API the way front-desk staff and patients would:
//! register, advance, look up by ticket and token, then read the monitor.

use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use ed_queue::Trace;
use ed_queue::domain::VisitService;
use ed_queue::domain::ticket::TicketCodec;
use ed_queue::inbound::http::configure_api;
use ed_queue::inbound::http::state::HttpState;
use ed_queue::test_support::memory::InMemoryStore;
use ed_queue::test_support::time::{MutableClock, RecordingSleeper};

fn http_state() -> HttpState {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .single()
            .expect("valid timestamp"),
    ));
    let service = Arc::new(VisitService::new(
        store.clone(),
        store,
        TicketCodec::new("flow-secret", 10),
        clock,
        Arc::new(RecordingSleeper::default()),
    ));
    HttpState::new(service.clone(), service)
}

#[actix_web::test]
async fn registered_patient_is_tracked_through_the_queue() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(http_state()))
            .wrap(Trace)
            .service(web::scope("/api/v1").configure(configure_api)),
    )
    .await;

    let created = test::TestRequest::post()
        .uri("/api/v1/visits")
        .set_json(json!({
            "patientName": "Asep Sunandar",
            "guardianName": "Euis Sunandar",
            "guardianPhone": "0812-3456-7890",
            "complaint": "high fever"
        }))
        .send_request(&app)
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(created).await;
    assert_eq!(created["ticketCode"], "AS001");
    assert_eq!(created["stage"], "registered");
    let visit_id = created["id"].as_str().expect("visit id").to_owned();

    let advanced = test::TestRequest::post()
        .uri(&format!("/api/v1/visits/{visit_id}/advance"))
        .send_request(&app)
        .await;
    assert_eq!(advanced.status(), StatusCode::OK);
    let advanced: Value = test::read_body_json(advanced).await;
    assert_eq!(advanced["stage"], "triage");

    let encoded = test::TestRequest::post()
        .uri("/api/v1/tickets/encode")
        .set_json(json!({ "ticketCode": "as 001" }))
        .send_request(&app)
        .await;
    assert_eq!(encoded.status(), StatusCode::OK);
    let encoded: Value = test::read_body_json(encoded).await;
    let token = encoded["token"].as_str().expect("token").to_owned();

    let by_token = test::TestRequest::get()
        .uri(&format!("/api/v1/status?ticket={token}"))
        .send_request(&app)
        .await;
    assert_eq!(by_token.status(), StatusCode::OK);
    let by_token: Value = test::read_body_json(by_token).await;
    assert_eq!(by_token["id"], visit_id.as_str());
    assert_eq!(by_token["stage"], "triage");

    let summary = test::TestRequest::get()
        .uri("/api/v1/monitoring/summary")
        .send_request(&app)
        .await;
    assert_eq!(summary.status(), StatusCode::OK);
    let summary: Value = test::read_body_json(summary).await;
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["byStage"]["triage"], 1);
}

#[actix_web::test]
async fn unknown_ticket_is_not_found_with_trace_id() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(http_state()))
            .wrap(Trace)
            .service(web::scope("/api/v1").configure(configure_api)),
    )
    .await;

    let response = test::TestRequest::get()
        .uri("/api/v1/status?ticket=ZZ999")
        .send_request(&app)
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("trace-id"));
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["code"], "not_found");
    assert!(body["traceId"].is_string());
}
