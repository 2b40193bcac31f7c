//! Visit domain service.
//!
//! Implements the visit driving ports: registering patients with a freshly
//! issued ticket, moving visits through the workflow, and resolving tickets
//! and tokens within the lookup window.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::ports::{
    AdvanceVisitRequest, CreateVisitRequest, EncodedTicket, PatientRepository,
    PatientRepositoryError, QueueSummary, TicketRequest, TicketValidation, VisitCommand,
    VisitQuery, VisitRepository, VisitRepositoryError, VisitView,
};
use crate::domain::ticket::{
    TicketCode, TicketCodec, TicketOrigin, TicketSequencer, TicketSequencerConfig,
    normalize_ticket_input,
};
use crate::domain::{
    Error, Patient, PatientDraft, RetryPolicy, Sleeper, Visit, VisitDetails, VisitStage,
    lookup_window_start, normalize_complaint,
};

const TICKET_NOT_FOUND: &str = "ticket not found or expired";
const CREATE_EXHAUSTED: &str = "unable to create visit, please retry";

fn map_visit_error(error: VisitRepositoryError) -> Error {
    match error {
        VisitRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("visit repository unavailable: {message}"))
        }
        VisitRepositoryError::Query { message } => {
            Error::internal(format!("visit repository error: {message}"))
        }
        VisitRepositoryError::DuplicateTicket { ticket_code } => {
            Error::conflict(format!("ticket code {ticket_code} is already in use"))
        }
    }
}

fn map_patient_error(error: PatientRepositoryError) -> Error {
    match error {
        PatientRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("patient repository unavailable: {message}"))
        }
        PatientRepositoryError::Query { message } => {
            Error::internal(format!("patient repository error: {message}"))
        }
    }
}

/// Retry schedules used by [`VisitService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitServiceConfig {
    /// Schedule for re-issuing a ticket after a uniqueness violation.
    pub insert_retry: RetryPolicy,
    /// Schedule for the sequencer's last-ticket read.
    pub sequencer: TicketSequencerConfig,
}

impl Default for VisitServiceConfig {
    fn default() -> Self {
        Self {
            insert_retry: RetryPolicy::linear(3, Duration::from_millis(100)),
            sequencer: TicketSequencerConfig::default(),
        }
    }
}

/// Visit service implementing the command and query driving ports.
pub struct VisitService<P, V> {
    patients: Arc<P>,
    visits: Arc<V>,
    sequencer: TicketSequencer<V>,
    codec: TicketCodec,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    insert_retry: RetryPolicy,
}

impl<P, V> VisitService<P, V> {
    /// Create a service with the default retry schedules.
    pub fn new(
        patients: Arc<P>,
        visits: Arc<V>,
        codec: TicketCodec,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self::with_config(
            patients,
            visits,
            codec,
            clock,
            sleeper,
            VisitServiceConfig::default(),
        )
    }

    /// Create a service with explicit retry schedules.
    pub fn with_config(
        patients: Arc<P>,
        visits: Arc<V>,
        codec: TicketCodec,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
        config: VisitServiceConfig,
    ) -> Self {
        let sequencer = TicketSequencer::new(visits.clone(), clock.clone(), sleeper.clone())
            .with_config(config.sequencer);
        Self {
            patients,
            visits,
            sequencer,
            codec,
            clock,
            sleeper,
            insert_retry: config.insert_retry,
        }
    }
}

impl<P, V> VisitService<P, V>
where
    V: VisitRepository,
{
    async fn find_details(&self, visit_id: Uuid) -> Result<VisitDetails, Error> {
        self.visits
            .find_by_id(&visit_id)
            .await
            .map_err(map_visit_error)?
            .ok_or_else(|| Error::not_found(format!("visit {visit_id} not found")))
    }

    /// Resolve a canonical ticket code created within the lookup window.
    ///
    /// Fallback tickets may be padded wider than their magnitude, so every
    /// spelling of a parseable code is searched.
    async fn find_by_ticket(&self, ticket_code: &str) -> Result<VisitDetails, Error> {
        if ticket_code.is_empty() {
            return Err(Error::invalid_request("ticket code is required"));
        }
        let spellings = TicketCode::parse(ticket_code)
            .map_or_else(|| vec![ticket_code.to_owned()], |code| code.spellings());
        let since = lookup_window_start(self.clock.utc());

        self.visits
            .find_by_ticket_codes_since(&spellings, since)
            .await
            .map_err(map_visit_error)?
            .ok_or_else(|| Error::not_found(TICKET_NOT_FOUND))
    }
}

impl<P, V> VisitService<P, V>
where
    P: PatientRepository,
    V: VisitRepository,
{
    /// Issue a ticket and insert the visit, re-issuing on ticket collisions.
    async fn open_visit(
        &self,
        patient: &Patient,
        complaint: Option<String>,
    ) -> Result<Visit, Error> {
        let attempts = self.insert_retry.attempts();
        let mut attempt = 1;
        loop {
            let issued = self.sequencer.next_ticket(patient.name()).await;
            if issued.origin == TicketOrigin::Degraded {
                warn!(
                    ticket_code = %issued.code,
                    "issued degraded ticket; last ticket of the day was unreadable",
                );
            }

            let visit = Visit::register(
                Uuid::new_v4(),
                patient.id(),
                issued.code.to_string(),
                issued.day,
                complaint.clone(),
                self.clock.utc(),
            )
            .map_err(|err| Error::invalid_request(err.to_string()))?;

            match self.visits.insert(&visit).await {
                Ok(()) => {
                    info!(
                        visit_id = %visit.id(),
                        ticket_code = visit.ticket_code(),
                        attempt,
                        "visit created",
                    );
                    return Ok(visit);
                }
                Err(VisitRepositoryError::DuplicateTicket { ticket_code }) if attempt < attempts => {
                    let delay = self.insert_retry.delay_after(attempt);
                    warn!(
                        %ticket_code,
                        attempt,
                        max_attempts = attempts,
                        "ticket code already taken; issuing another",
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(VisitRepositoryError::DuplicateTicket { ticket_code }) => {
                    error!(
                        %ticket_code,
                        attempts,
                        "ticket contention persisted; giving up",
                    );
                    return Err(Error::service_unavailable(CREATE_EXHAUSTED));
                }
                Err(other) => return Err(map_visit_error(other)),
            }
        }
    }

    /// Remove the patient row of a registration whose visit was never stored.
    async fn discard_patient(&self, patient: &Patient) {
        if let Err(err) = self.patients.delete(&patient.id()).await {
            warn!(
                patient_id = %patient.id(),
                error = %err,
                "failed to remove patient of an abandoned registration",
            );
        }
    }
}

#[async_trait]
impl<P, V> VisitCommand for VisitService<P, V>
where
    P: PatientRepository,
    V: VisitRepository,
{
    async fn create_visit(&self, request: CreateVisitRequest) -> Result<VisitView, Error> {
        let CreateVisitRequest {
            patient_name,
            guardian_name,
            guardian_phone,
            complaint,
        } = request;
        let complaint = normalize_complaint(complaint)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let patient = Patient::new(
            Uuid::new_v4(),
            PatientDraft {
                name: patient_name,
                guardian_name,
                guardian_phone,
            },
            self.clock.utc(),
        )
        .map_err(|err| Error::invalid_request(err.to_string()))?;

        self.patients
            .insert(&patient)
            .await
            .map_err(map_patient_error)?;

        match self.open_visit(&patient, complaint).await {
            Ok(visit) => Ok(VisitView::from(VisitDetails { visit, patient })),
            Err(err) => {
                self.discard_patient(&patient).await;
                Err(err)
            }
        }
    }

    async fn advance_visit(&self, request: AdvanceVisitRequest) -> Result<VisitView, Error> {
        let VisitDetails { visit, patient } = self.find_details(request.visit_id).await?;
        let from = visit.stage();
        let Some(to) = from.next() else {
            return Err(Error::conflict(format!(
                "visit {} is already discharged",
                visit.id()
            )));
        };

        let at = self.clock.utc();
        let advanced = self
            .visits
            .advance_stage(&visit.id(), from, to, at)
            .await
            .map_err(map_visit_error)?;
        if !advanced {
            return Err(Error::conflict(format!(
                "visit {} changed stage concurrently; reload and retry",
                visit.id()
            )));
        }

        info!(visit_id = %visit.id(), %from, %to, "visit advanced");
        Ok(VisitView::from(VisitDetails {
            visit: visit.with_stage(to, at),
            patient,
        }))
    }
}

#[async_trait]
impl<P, V> VisitQuery for VisitService<P, V>
where
    P: PatientRepository,
    V: VisitRepository,
{
    async fn get_visit(&self, visit_id: Uuid) -> Result<VisitView, Error> {
        self.find_details(visit_id).await.map(VisitView::from)
    }

    async fn validate_ticket(&self, request: TicketRequest) -> Result<TicketValidation, Error> {
        let ticket_code = normalize_ticket_input(&request.ticket_code);
        let details = self.find_by_ticket(&ticket_code).await?;
        Ok(TicketValidation {
            valid: true,
            visit: details.into(),
        })
    }

    async fn encode_ticket(&self, request: TicketRequest) -> Result<EncodedTicket, Error> {
        let ticket_code = normalize_ticket_input(&request.ticket_code);
        let details = self.find_by_ticket(&ticket_code).await?;
        let stored = details.visit.ticket_code();
        let token = self.codec.encode(stored).map_err(|err| {
            error!(error = %err, ticket_code = stored, "ticket could not be encoded");
            Error::internal(err.to_string())
        })?;
        Ok(EncodedTicket {
            ticket_code: stored.to_owned(),
            token,
        })
    }

    async fn status(&self, ticket: String) -> Result<VisitView, Error> {
        let decoded = self.codec.decode_detailed(ticket.trim());
        debug!(format = ?decoded.format, "resolving ticket status");
        let ticket_code = normalize_ticket_input(&decoded.code);
        self.find_by_ticket(&ticket_code).await.map(VisitView::from)
    }

    async fn active_queue(&self) -> Result<Vec<VisitView>, Error> {
        let since = lookup_window_start(self.clock.utc());
        let active = self
            .visits
            .list_active_since(since)
            .await
            .map_err(map_visit_error)?;
        Ok(active.into_iter().map(VisitView::from).collect())
    }

    async fn summary(&self) -> Result<QueueSummary, Error> {
        let since = lookup_window_start(self.clock.utc());
        let counts = self
            .visits
            .count_by_stage_since(since)
            .await
            .map_err(map_visit_error)?;

        let mut by_stage: BTreeMap<VisitStage, u64> =
            VisitStage::ALL.into_iter().map(|stage| (stage, 0)).collect();
        for entry in counts {
            *by_stage.entry(entry.stage).or_default() += entry.count;
        }
        Ok(QueueSummary {
            total: by_stage.values().sum(),
            by_stage,
        })
    }
}

#[cfg(test)]
#[path = "visit_service_tests.rs"]
mod tests;
