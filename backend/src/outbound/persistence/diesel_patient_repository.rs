//! PostgreSQL-backed `PatientRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::Patient;
use crate::domain::ports::{PatientRepository, PatientRepositoryError};

use super::diesel_error_mapping::StoreFailure;
use super::models::NewPatientRow;
use super::pool::DbPool;
use super::schema::patients;

/// Diesel implementation of the `PatientRepository` port.
#[derive(Clone)]
pub struct DieselPatientRepository {
    pool: DbPool,
}

impl DieselPatientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_failure(failure: impl Into<StoreFailure>) -> PatientRepositoryError {
    match failure.into() {
        StoreFailure::Connection(message) => PatientRepositoryError::connection(message),
        StoreFailure::Query(message) => PatientRepositoryError::query(message),
        StoreFailure::UniqueViolation { constraint } => PatientRepositoryError::query(format!(
            "unique violation on {}",
            constraint.as_deref().unwrap_or("patients")
        )),
    }
}

#[async_trait]
impl PatientRepository for DieselPatientRepository {
    async fn insert(&self, patient: &Patient) -> Result<(), PatientRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_failure)?;
        diesel::insert_into(patients::table)
            .values(NewPatientRow::from(patient))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_failure)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), PatientRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_failure)?;
        diesel::delete(patients::table.filter(patients::id.eq(id)))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_failure)
    }
}
