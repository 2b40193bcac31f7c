//! Port for visit persistence, ticket lookups, and queue reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Visit, VisitDetails, VisitStage};

use super::define_port_error;

define_port_error! {
    /// Errors raised by visit repository adapters.
    pub enum VisitRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "visit repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "visit repository query failed: {message}",
        /// The ticket code is already held by another visit.
        DuplicateTicket { ticket_code: String } =>
            "ticket code {ticket_code} is already in use",
    }
}

/// Number of visits currently sitting in one workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageCount {
    pub stage: VisitStage,
    pub count: u64,
}

/// Port for writing visits and reading them back by id, ticket, or window.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitRepository: Send + Sync {
    /// Ticket code of the most recently created visit with
    /// `created_at >= since`.
    async fn last_ticket_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Option<String>, VisitRepositoryError>;

    /// Persist a new visit.
    ///
    /// Fails with [`VisitRepositoryError::DuplicateTicket`] when the ticket
    /// code is already taken on the visit's ticket day.
    async fn insert(&self, visit: &Visit) -> Result<(), VisitRepositoryError>;

    /// Find a visit and its patient by visit id.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<VisitDetails>, VisitRepositoryError>;

    /// Newest visit created at or after `since` whose ticket code is one of
    /// `ticket_codes`.
    async fn find_by_ticket_codes_since(
        &self,
        ticket_codes: &[String],
        since: DateTime<Utc>,
    ) -> Result<Option<VisitDetails>, VisitRepositoryError>;

    /// Move a visit from `from` to `to`, touching `updated_at`.
    ///
    /// Returns `false` when the visit was no longer in `from`.
    async fn advance_stage(
        &self,
        id: &Uuid,
        from: VisitStage,
        to: VisitStage,
        at: DateTime<Utc>,
    ) -> Result<bool, VisitRepositoryError>;

    /// Visits created at or after `since` that are not yet discharged,
    /// oldest first.
    async fn list_active_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<VisitDetails>, VisitRepositoryError>;

    /// Per-stage visit counts for visits created at or after `since`.
    ///
    /// Stages without visits may be omitted.
    async fn count_by_stage_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StageCount>, VisitRepositoryError>;
}

/// Fixture implementation for tests that do not exercise visit persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureVisitRepository;

#[async_trait]
impl VisitRepository for FixtureVisitRepository {
    async fn last_ticket_since(
        &self,
        _since: DateTime<Utc>,
    ) -> Result<Option<String>, VisitRepositoryError> {
        Ok(None)
    }

    async fn insert(&self, _visit: &Visit) -> Result<(), VisitRepositoryError> {
        Ok(())
    }

    async fn find_by_id(&self, _id: &Uuid) -> Result<Option<VisitDetails>, VisitRepositoryError> {
        Ok(None)
    }

    async fn find_by_ticket_codes_since(
        &self,
        _ticket_codes: &[String],
        _since: DateTime<Utc>,
    ) -> Result<Option<VisitDetails>, VisitRepositoryError> {
        Ok(None)
    }

    async fn advance_stage(
        &self,
        _id: &Uuid,
        _from: VisitStage,
        _to: VisitStage,
        _at: DateTime<Utc>,
    ) -> Result<bool, VisitRepositoryError> {
        Ok(false)
    }

    async fn list_active_since(
        &self,
        _since: DateTime<Utc>,
    ) -> Result<Vec<VisitDetails>, VisitRepositoryError> {
        Ok(Vec::new())
    }

    async fn count_by_stage_since(
        &self,
        _since: DateTime<Utc>,
    ) -> Result<Vec<StageCount>, VisitRepositoryError> {
        Ok(Vec::new())
    }
}
