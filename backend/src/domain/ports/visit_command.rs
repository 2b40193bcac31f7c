//! Driving port for visit mutations.
//!
//! Registering a patient opens a visit with a freshly issued ticket; staff
//! then move the visit through the workflow one stage at a time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Error, VisitDetails, VisitStage};

/// Request to register a patient and open a visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisitRequest {
    #[schema(example = "Asep Sunandar")]
    pub patient_name: String,
    #[schema(example = "Euis Sunandar")]
    pub guardian_name: String,
    #[schema(example = "0812-3456-7890")]
    pub guardian_phone: String,
    #[serde(default)]
    #[schema(example = "high fever since last night")]
    pub complaint: Option<String>,
}

/// Request to move a visit to its next workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceVisitRequest {
    pub visit_id: Uuid,
}

/// Flattened visit record merged with its patient's display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitView {
    pub id: Uuid,
    #[schema(example = "AS076")]
    pub ticket_code: String,
    pub stage: VisitStage,
    pub complaint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub guardian_name: String,
    pub guardian_phone: String,
}

impl From<VisitDetails> for VisitView {
    fn from(value: VisitDetails) -> Self {
        let VisitDetails { visit, patient } = value;
        Self {
            id: visit.id(),
            ticket_code: visit.ticket_code().to_owned(),
            stage: visit.stage(),
            complaint: visit.complaint().map(str::to_owned),
            created_at: visit.created_at(),
            updated_at: visit.updated_at(),
            patient_id: patient.id(),
            patient_name: patient.name().to_owned(),
            guardian_name: patient.guardian_name().to_owned(),
            guardian_phone: patient.guardian_phone().to_owned(),
        }
    }
}

/// Driving port for visit mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitCommand: Send + Sync {
    /// Register the patient, issue a ticket, and open the visit.
    async fn create_visit(&self, request: CreateVisitRequest) -> Result<VisitView, Error>;

    /// Advance a visit by exactly one workflow stage.
    ///
    /// Discharged visits yield a conflict error.
    async fn advance_visit(&self, request: AdvanceVisitRequest) -> Result<VisitView, Error>;
}

/// Fixture command that rejects every mutation.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureVisitCommand;

#[async_trait]
impl VisitCommand for FixtureVisitCommand {
    async fn create_visit(&self, _request: CreateVisitRequest) -> Result<VisitView, Error> {
        Err(Error::service_unavailable("visit registration is not configured"))
    }

    async fn advance_visit(&self, request: AdvanceVisitRequest) -> Result<VisitView, Error> {
        Err(Error::not_found(format!("visit {} not found", request.visit_id)))
    }
}
