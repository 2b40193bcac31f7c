//! Driving port for visit reads: single visits, ticket checks, public status
//! lookup, and the monitoring views of the trailing day.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Error, VisitStage};

use super::visit_command::VisitView;

/// Request carrying a raw ticket code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketRequest {
    #[schema(example = "AS076")]
    pub ticket_code: String,
}

/// Outcome of a successful ticket validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketValidation {
    pub valid: bool,
    pub visit: VisitView,
}

/// Ticket code paired with its public token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncodedTicket {
    #[schema(example = "AS076")]
    pub ticket_code: String,
    #[schema(example = "Xk4RzQm9vb")]
    pub token: String,
}

/// Visit counts of the trailing day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueSummary {
    pub total: u64,
    /// Every workflow stage, zero when empty.
    pub by_stage: BTreeMap<VisitStage, u64>,
}

/// Driving port for visit read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitQuery: Send + Sync {
    /// Fetch one visit merged with its patient.
    async fn get_visit(&self, visit_id: Uuid) -> Result<VisitView, Error>;

    /// Confirm a raw ticket code belongs to a visit of the trailing day.
    async fn validate_ticket(&self, request: TicketRequest) -> Result<TicketValidation, Error>;

    /// Produce the public token of a ticket that is still resolvable.
    async fn encode_ticket(&self, request: TicketRequest) -> Result<EncodedTicket, Error>;

    /// Resolve a public token or raw ticket code to its visit.
    async fn status(&self, ticket: String) -> Result<VisitView, Error>;

    /// Undischarged visits of the trailing day, oldest first.
    async fn active_queue(&self) -> Result<Vec<VisitView>, Error>;

    /// Per-stage counts of the trailing day.
    async fn summary(&self) -> Result<QueueSummary, Error>;
}

/// Fixture query returning empty monitoring data and no visits.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureVisitQuery;

#[async_trait]
impl VisitQuery for FixtureVisitQuery {
    async fn get_visit(&self, visit_id: Uuid) -> Result<VisitView, Error> {
        Err(Error::not_found(format!("visit {visit_id} not found")))
    }

    async fn validate_ticket(&self, _request: TicketRequest) -> Result<TicketValidation, Error> {
        Err(Error::not_found("ticket not found or expired"))
    }

    async fn encode_ticket(&self, _request: TicketRequest) -> Result<EncodedTicket, Error> {
        Err(Error::not_found("ticket not found or expired"))
    }

    async fn status(&self, _ticket: String) -> Result<VisitView, Error> {
        Err(Error::not_found("ticket not found or expired"))
    }

    async fn active_queue(&self) -> Result<Vec<VisitView>, Error> {
        Ok(Vec::new())
    }

    async fn summary(&self) -> Result<QueueSummary, Error> {
        Ok(QueueSummary {
            total: 0,
            by_stage: VisitStage::ALL.into_iter().map(|stage| (stage, 0)).collect(),
        })
    }
}
