//! Tests for the visit service.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use mockall::Sequence;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{FixturePatientRepository, MockPatientRepository, MockVisitRepository};
use crate::domain::ticket::TicketWidth;
use crate::test_support::memory::InMemoryStore;
use crate::test_support::time::{MutableClock, RecordingSleeper};

const SECRET: &str = "visit-service-secret";

fn codec() -> TicketCodec {
    TicketCodec::new(SECRET, 10)
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn request(name: &str) -> CreateVisitRequest {
    CreateVisitRequest {
        patient_name: name.to_owned(),
        guardian_name: "Euis".to_owned(),
        guardian_phone: "0812-3456-7890".to_owned(),
        complaint: Some("fever".to_owned()),
    }
}

fn millis(values: &[u64]) -> Vec<Duration> {
    values.iter().copied().map(Duration::from_millis).collect()
}

struct Harness {
    store: Arc<InMemoryStore>,
    clock: Arc<MutableClock>,
    sleeper: Arc<RecordingSleeper>,
    service: VisitService<InMemoryStore, InMemoryStore>,
}

impl Harness {
    async fn seed(&self, name: &str, ticket_code: &str) -> Visit {
        let now = self.clock.utc();
        let patient = Patient::new(
            Uuid::new_v4(),
            PatientDraft {
                name: name.to_owned(),
                guardian_name: "Seed".to_owned(),
                guardian_phone: "08123456789".to_owned(),
            },
            now,
        )
        .expect("valid patient");
        PatientRepository::insert(self.store.as_ref(), &patient)
            .await
            .expect("seed patient");
        let visit = Visit::register(
            Uuid::new_v4(),
            patient.id(),
            ticket_code.to_owned(),
            self.clock.local().date_naive(),
            None,
            now,
        )
        .expect("valid visit");
        VisitRepository::insert(self.store.as_ref(), &visit)
            .await
            .expect("seed visit");
        visit
    }
}

#[fixture]
fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(MutableClock::new(start()));
    let sleeper = Arc::new(RecordingSleeper::default());
    let service = VisitService::new(
        store.clone(),
        store.clone(),
        codec(),
        clock.clone(),
        sleeper.clone(),
    );
    Harness {
        store,
        clock,
        sleeper,
        service,
    }
}

fn mocked_service(
    visits: MockVisitRepository,
    sleeper: &Arc<RecordingSleeper>,
) -> VisitService<FixturePatientRepository, MockVisitRepository> {
    VisitService::new(
        Arc::new(FixturePatientRepository),
        Arc::new(visits),
        codec(),
        Arc::new(MutableClock::new(start())),
        sleeper.clone(),
    )
}

#[rstest]
#[tokio::test]
async fn create_visit_issues_consecutive_tickets(harness: Harness) {
    let first = harness
        .service
        .create_visit(request("Asep Sunandar"))
        .await
        .expect("first visit");
    let second = harness
        .service
        .create_visit(request("Budi"))
        .await
        .expect("second visit");

    assert_eq!(first.ticket_code, "AS001");
    assert_eq!(second.ticket_code, "BU002");
    assert_eq!(first.stage, VisitStage::Registered);
    assert_eq!(first.guardian_phone, "081234567890");
    assert_eq!(first.complaint.as_deref(), Some("fever"));
    assert_eq!(harness.store.patient_count(), 2);
}

#[rstest]
#[case(request(""))]
#[case(CreateVisitRequest { guardian_phone: "12-34".to_owned(), ..request("Asep") })]
#[case(CreateVisitRequest { guardian_name: "  ".to_owned(), ..request("Asep") })]
#[case(CreateVisitRequest { complaint: Some("x".repeat(501)), ..request("Asep") })]
#[tokio::test]
async fn create_visit_rejects_invalid_payloads(
    harness: Harness,
    #[case] payload: CreateVisitRequest,
) {
    let err = harness
        .service
        .create_visit(payload)
        .await
        .expect_err("validation fails");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(harness.store.patient_count(), 0);
    assert!(harness.store.visits().is_empty());
}

#[rstest]
#[tokio::test]
async fn concurrent_creates_resolve_ticket_collision(harness: Harness) {
    harness.seed("Ani Suryani", "AS076").await;
    harness.store.gate_next_ticket_reads(2);

    let (first, second) = tokio::join!(
        harness.service.create_visit(request("Asep Sunandar")),
        harness.service.create_visit(request("Andi Setiawan")),
    );

    let mut tickets = vec![
        first.expect("first create").ticket_code,
        second.expect("second create").ticket_code,
    ];
    tickets.sort();
    assert_eq!(tickets, vec!["AS077", "AS078"]);
    assert_eq!(harness.sleeper.recorded(), millis(&[100]));
}

#[rstest]
#[tokio::test]
async fn create_visit_degrades_when_last_ticket_is_unreadable(harness: Harness) {
    harness.store.fail_next_ticket_reads(5);

    let view = harness
        .service
        .create_visit(request("Asep Sunandar"))
        .await
        .expect("degraded create succeeds");

    let expected = harness.clock.utc().timestamp_millis() % 10_000;
    assert_eq!(view.ticket_code, format!("AS{expected:04}"));
    let code = TicketCode::parse(&view.ticket_code).expect("parseable");
    assert_eq!(code.width(), TicketWidth::Four);
    assert_eq!(harness.sleeper.recorded(), millis(&[100, 200, 400, 800]));
}

#[rstest]
#[tokio::test]
async fn duplicate_inserts_retry_linearly() {
    let mut visits = MockVisitRepository::new();
    visits
        .expect_last_ticket_since()
        .times(3)
        .returning(|_| Ok(Some("AS076".to_owned())));
    let mut seq = Sequence::new();
    visits
        .expect_insert()
        .times(2)
        .in_sequence(&mut seq)
        .returning(|visit| Err(VisitRepositoryError::duplicate_ticket(visit.ticket_code())));
    visits
        .expect_insert()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    let sleeper = Arc::new(RecordingSleeper::default());

    let view = mocked_service(visits, &sleeper)
        .create_visit(request("Asep Sunandar"))
        .await
        .expect("third attempt succeeds");

    assert_eq!(view.ticket_code, "AS077");
    assert_eq!(sleeper.recorded(), millis(&[100, 200]));
}

#[rstest]
#[tokio::test]
async fn exhausted_duplicate_retries_are_service_unavailable() {
    let mut visits = MockVisitRepository::new();
    visits
        .expect_last_ticket_since()
        .times(3)
        .returning(|_| Ok(Some("AS076".to_owned())));
    visits
        .expect_insert()
        .times(3)
        .returning(|visit| Err(VisitRepositoryError::duplicate_ticket(visit.ticket_code())));
    let sleeper = Arc::new(RecordingSleeper::default());

    let err = mocked_service(visits, &sleeper)
        .create_visit(request("Asep Sunandar"))
        .await
        .expect_err("contention persists");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(err.message(), "unable to create visit, please retry");
    assert_eq!(sleeper.recorded(), millis(&[100, 200]));
}

#[rstest]
#[tokio::test]
async fn exhausted_retries_leave_no_orphan_patient(harness: Harness) {
    // AS076 is the newest ticket, so every attempt re-issues the taken AS077.
    harness.seed("Ani Suryani", "AS077").await;
    harness.seed("Ahmad Subagja", "AS076").await;

    let err = harness
        .service
        .create_visit(request("Asep Sunandar"))
        .await
        .expect_err("contention persists");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    assert_eq!(harness.store.patient_count(), 2);
    assert_eq!(harness.store.visits().len(), 2);
    assert_eq!(harness.sleeper.recorded(), millis(&[100, 200]));
}

#[rstest]
#[tokio::test]
async fn failed_visit_insert_removes_its_patient() {
    let inserted = Arc::new(std::sync::Mutex::new(None));
    let mut patients = MockPatientRepository::new();
    let recorded = inserted.clone();
    patients.expect_insert().times(1).returning(move |patient| {
        *recorded.lock().expect("recorder") = Some(patient.id());
        Ok(())
    });
    let expected = inserted.clone();
    patients
        .expect_delete()
        .times(1)
        .withf(move |id| *expected.lock().expect("recorder") == Some(*id))
        .returning(|_| Ok(()));
    let mut visits = MockVisitRepository::new();
    visits.expect_last_ticket_since().returning(|_| Ok(None));
    visits
        .expect_insert()
        .times(1)
        .returning(|_| Err(VisitRepositoryError::connection("pool drained")));
    let service = VisitService::new(
        Arc::new(patients),
        Arc::new(visits),
        codec(),
        Arc::new(MutableClock::new(start())),
        Arc::new(RecordingSleeper::default()),
    );

    let err = service
        .create_visit(request("Asep Sunandar"))
        .await
        .expect_err("visit insert fails");

    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn other_insert_failures_are_not_retried() {
    let mut visits = MockVisitRepository::new();
    visits
        .expect_last_ticket_since()
        .times(1)
        .returning(|_| Ok(None));
    visits
        .expect_insert()
        .times(1)
        .returning(|_| Err(VisitRepositoryError::query("constraint check failed")));
    let sleeper = Arc::new(RecordingSleeper::default());

    let err = mocked_service(visits, &sleeper)
        .create_visit(request("Asep Sunandar"))
        .await
        .expect_err("query error propagates");

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert!(sleeper.recorded().is_empty());
}

#[rstest]
#[tokio::test]
async fn advance_walks_the_workflow_then_conflicts(harness: Harness) {
    let visit = harness.seed("Asep Sunandar", "AS001").await;
    let request = AdvanceVisitRequest {
        visit_id: visit.id(),
    };

    let mut stages = Vec::new();
    for _ in 0..5 {
        harness.clock.advance(TimeDelta::minutes(10));
        let view = harness
            .service
            .advance_visit(request)
            .await
            .expect("advance succeeds");
        assert_eq!(view.updated_at, harness.clock.utc());
        stages.push(view.stage);
    }
    assert_eq!(stages, VisitStage::ALL[1..].to_vec());

    let err = harness
        .service
        .advance_visit(request)
        .await
        .expect_err("discharged visits cannot advance");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn advance_reports_lost_race_as_conflict(harness: Harness) {
    let visit = harness.seed("Asep Sunandar", "AS001").await;
    let details = VisitDetails {
        visit: visit.clone(),
        patient: Patient::new(
            visit.patient_id(),
            PatientDraft {
                name: "Asep Sunandar".to_owned(),
                guardian_name: "Seed".to_owned(),
                guardian_phone: "08123456789".to_owned(),
            },
            start(),
        )
        .expect("valid patient"),
    };
    let mut visits = MockVisitRepository::new();
    visits
        .expect_find_by_id()
        .times(1)
        .return_once(move |_| Ok(Some(details)));
    visits
        .expect_advance_stage()
        .withf(|_, from, to, _| *from == VisitStage::Registered && *to == VisitStage::Triage)
        .times(1)
        .returning(|_, _, _, _| Ok(false));
    let sleeper = Arc::new(RecordingSleeper::default());

    let err = mocked_service(visits, &sleeper)
        .advance_visit(AdvanceVisitRequest {
            visit_id: visit.id(),
        })
        .await
        .expect_err("stale stage");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn get_visit_flattens_patient_fields(harness: Harness) {
    let visit = harness.seed("Asep Sunandar", "AS001").await;

    let view = harness
        .service
        .get_visit(visit.id())
        .await
        .expect("visit found");

    assert_eq!(view.id, visit.id());
    assert_eq!(view.patient_id, visit.patient_id());
    assert_eq!(view.patient_name, "Asep Sunandar");
    assert_eq!(view.guardian_name, "Seed");
}

#[rstest]
#[tokio::test]
async fn get_visit_reports_missing_visits(harness: Harness) {
    let err = harness
        .service
        .get_visit(Uuid::new_v4())
        .await
        .expect_err("unknown visit");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn repository_outage_maps_to_service_unavailable() {
    let mut visits = MockVisitRepository::new();
    visits
        .expect_find_by_id()
        .times(1)
        .returning(|_| Err(VisitRepositoryError::connection("pool timed out")));
    let sleeper = Arc::new(RecordingSleeper::default());

    let err = mocked_service(visits, &sleeper)
        .get_visit(Uuid::new_v4())
        .await
        .expect_err("outage");
    assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn validate_ticket_normalises_input(harness: Harness) {
    let visit = harness.seed("Asep Sunandar", "AS076").await;

    let validation = harness
        .service
        .validate_ticket(TicketRequest {
            ticket_code: " as 076 ".to_owned(),
        })
        .await
        .expect("ticket valid");

    assert!(validation.valid);
    assert_eq!(validation.visit.id, visit.id());
}

#[rstest]
#[tokio::test]
async fn blank_tickets_are_invalid_requests(harness: Harness) {
    let err = harness
        .service
        .validate_ticket(TicketRequest {
            ticket_code: "   ".to_owned(),
        })
        .await
        .expect_err("blank ticket");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn tickets_expire_after_a_day(harness: Harness) {
    harness.seed("Asep Sunandar", "AS076").await;
    let lookup = || TicketRequest {
        ticket_code: "AS076".to_owned(),
    };

    harness.clock.advance(TimeDelta::hours(23));
    harness
        .service
        .validate_ticket(lookup())
        .await
        .expect("still inside the window");

    harness.clock.advance(TimeDelta::hours(2));
    let err = harness
        .service
        .validate_ticket(lookup())
        .await
        .expect_err("expired");
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), "ticket not found or expired");
}

#[rstest]
#[tokio::test]
async fn encode_then_status_resolves_the_visit(harness: Harness) {
    let visit = harness.seed("Asep Sunandar", "AS076").await;

    let encoded = harness
        .service
        .encode_ticket(TicketRequest {
            ticket_code: "as076".to_owned(),
        })
        .await
        .expect("encodable");
    assert_eq!(encoded.ticket_code, "AS076");
    assert!(encoded.token.len() >= 10);

    let view = harness
        .service
        .status(encoded.token)
        .await
        .expect("status resolves");
    assert_eq!(view.id, visit.id());
}

#[rstest]
#[tokio::test]
async fn status_accepts_raw_codes(harness: Harness) {
    let visit = harness.seed("Asep Sunandar", "AS076").await;
    let view = harness
        .service
        .status("as076".to_owned())
        .await
        .expect("raw code resolves");
    assert_eq!(view.id, visit.id());
}

#[rstest]
#[tokio::test]
async fn status_finds_wide_padded_fallback_tickets(harness: Harness) {
    let visit = harness.seed("Asep Sunandar", "AS0042").await;
    let token = codec().encode("AS0042").expect("encodable");

    let view = harness
        .service
        .status(token)
        .await
        .expect("padded fallback resolves");
    assert_eq!(view.id, visit.id());
    assert_eq!(view.ticket_code, "AS0042");
}

#[rstest]
#[tokio::test]
async fn encode_rejects_unknown_tickets(harness: Harness) {
    let err = harness
        .service
        .encode_ticket(TicketRequest {
            ticket_code: "ZZ999".to_owned(),
        })
        .await
        .expect_err("unknown ticket");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn queue_lists_active_visits_oldest_first(harness: Harness) {
    let first = harness.seed("Asep Sunandar", "AS001").await;
    harness.clock.advance(TimeDelta::minutes(5));
    let discharged = harness.seed("Budi", "BU002").await;
    harness.clock.advance(TimeDelta::minutes(5));
    let third = harness.seed("Citra Dewi", "CD003").await;

    for _ in 0..5 {
        harness
            .service
            .advance_visit(AdvanceVisitRequest {
                visit_id: discharged.id(),
            })
            .await
            .expect("advance succeeds");
    }

    let queue = harness.service.active_queue().await.expect("queue");
    let ids: Vec<_> = queue.iter().map(|view| view.id).collect();
    assert_eq!(ids, vec![first.id(), third.id()]);
}

#[rstest]
#[tokio::test]
async fn summary_counts_every_stage(harness: Harness) {
    let first = harness.seed("Asep Sunandar", "AS001").await;
    harness.seed("Budi", "BU002").await;
    harness
        .service
        .advance_visit(AdvanceVisitRequest {
            visit_id: first.id(),
        })
        .await
        .expect("advance succeeds");

    let summary = harness.service.summary().await.expect("summary");

    assert_eq!(summary.total, 2);
    assert_eq!(summary.by_stage.len(), VisitStage::ALL.len());
    assert_eq!(summary.by_stage[&VisitStage::Registered], 1);
    assert_eq!(summary.by_stage[&VisitStage::Triage], 1);
    assert_eq!(summary.by_stage[&VisitStage::Discharged], 0);
}
