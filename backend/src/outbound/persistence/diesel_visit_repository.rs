//! PostgreSQL-backed `VisitRepository`.
//!
//! Reads join `visits` with `patients` so callers always receive the patient
//! display fields alongside the visit. Stage changes are optimistic: the
//! update only matches while the row still holds the expected stage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;
use uuid::Uuid;

use crate::domain::ports::{StageCount, VisitRepository, VisitRepositoryError};
use crate::domain::{Visit, VisitDetails, VisitStage};

use super::diesel_error_mapping::StoreFailure;
use super::models::{NewVisitRow, PatientRow, StageUpdate, VisitRow, details_from_rows};
use super::pool::DbPool;
use super::schema::{patients, visits};

/// Diesel implementation of the `VisitRepository` port.
#[derive(Clone)]
pub struct DieselVisitRepository {
    pool: DbPool,
}

impl DieselVisitRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: impl Into<StoreFailure>) -> VisitRepositoryError {
    match failure.into() {
        StoreFailure::Connection(message) => VisitRepositoryError::connection(message),
        StoreFailure::Query(message) => VisitRepositoryError::query(message),
        StoreFailure::UniqueViolation { constraint } => VisitRepositoryError::query(format!(
            "unique violation on {}",
            constraint.as_deref().unwrap_or("visits")
        )),
    }
}

/// Like [`map_failure`], but reports ticket collisions as duplicates.
fn map_insert_failure(error: diesel::result::Error, ticket_code: &str) -> VisitRepositoryError {
    let failure = StoreFailure::from(error);
    if failure.is_ticket_collision() {
        VisitRepositoryError::duplicate_ticket(ticket_code)
    } else {
        map_failure(failure)
    }
}

fn to_details(rows: (VisitRow, PatientRow)) -> Result<VisitDetails, VisitRepositoryError> {
    details_from_rows(rows).map_err(VisitRepositoryError::query)
}

#[async_trait]
impl VisitRepository for DieselVisitRepository {
    async fn last_ticket_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Option<String>, VisitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_failure)?;
        visits::table
            .filter(visits::created_at.ge(since))
            .order(visits::created_at.desc())
            .select(visits::ticket_code)
            .first::<String>(&mut conn)
            .await
            .optional()
            .map_err(map_failure)
    }

    async fn insert(&self, visit: &Visit) -> Result<(), VisitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_failure)?;
        diesel::insert_into(visits::table)
            .values(NewVisitRow::from(visit))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_insert_failure(err, visit.ticket_code()))
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<VisitDetails>, VisitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_failure)?;
        let row: Option<(VisitRow, PatientRow)> = visits::table
            .inner_join(patients::table)
            .filter(visits::id.eq(id))
            .select((VisitRow::as_select(), PatientRow::as_select()))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_failure)?;
        row.map(to_details).transpose()
    }

    async fn find_by_ticket_codes_since(
        &self,
        ticket_codes: &[String],
        since: DateTime<Utc>,
    ) -> Result<Option<VisitDetails>, VisitRepositoryError> {
        if ticket_codes.is_empty() {
            return Ok(None);
        }
        let mut conn = self.pool.get().await.map_err(map_failure)?;
        let row: Option<(VisitRow, PatientRow)> = visits::table
            .inner_join(patients::table)
            .filter(visits::ticket_code.eq_any(ticket_codes))
            .filter(visits::created_at.ge(since))
            .order(visits::created_at.desc())
            .select((VisitRow::as_select(), PatientRow::as_select()))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_failure)?;
        row.map(to_details).transpose()
    }

    async fn advance_stage(
        &self,
        id: &Uuid,
        from: VisitStage,
        to: VisitStage,
        at: DateTime<Utc>,
    ) -> Result<bool, VisitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_failure)?;
        let updated = diesel::update(
            visits::table
                .filter(visits::id.eq(id))
                .filter(visits::stage.eq(from.as_str())),
        )
        .set(StageUpdate {
            stage: to.as_str(),
            updated_at: at,
        })
        .execute(&mut conn)
        .await
        .map_err(map_failure)?;
        Ok(updated > 0)
    }

    async fn list_active_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<VisitDetails>, VisitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_failure)?;
        let rows: Vec<(VisitRow, PatientRow)> = visits::table
            .inner_join(patients::table)
            .filter(visits::created_at.ge(since))
            .filter(visits::stage.ne(VisitStage::Discharged.as_str()))
            .order(visits::created_at.asc())
            .select((VisitRow::as_select(), PatientRow::as_select()))
            .load(&mut conn)
            .await
            .map_err(map_failure)?;
        rows.into_iter().map(to_details).collect()
    }

    async fn count_by_stage_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<StageCount>, VisitRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_failure)?;
        let rows: Vec<(String, i64)> = visits::table
            .filter(visits::created_at.ge(since))
            .group_by(visits::stage)
            .select((visits::stage, count_star()))
            .load(&mut conn)
            .await
            .map_err(map_failure)?;

        let mut counts = Vec::with_capacity(rows.len());
        for (label, count) in rows {
            match label.parse::<VisitStage>() {
                Ok(stage) => counts.push(StageCount {
                    stage,
                    count: u64::try_from(count).unwrap_or_default(),
                }),
                Err(err) => {
                    warn!(error = %err, count, "skipping visits with an unknown stage");
                }
            }
        }
        Ok(counts)
    }
}
