//! Port for patient registration persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::Patient;

use super::define_port_error;

define_port_error! {
    /// Errors raised by patient repository adapters.
    pub enum PatientRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "patient repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "patient repository query failed: {message}",
    }
}

/// Port for storing registered patients.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Persist a newly registered patient.
    async fn insert(&self, patient: &Patient) -> Result<(), PatientRepositoryError>;

    /// Remove a patient that never received a visit.
    ///
    /// Deleting an unknown id succeeds.
    async fn delete(&self, id: &Uuid) -> Result<(), PatientRepositoryError>;
}

/// Fixture implementation for tests that do not exercise patient persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePatientRepository;

#[async_trait]
impl PatientRepository for FixturePatientRepository {
    async fn insert(&self, _patient: &Patient) -> Result<(), PatientRepositoryError> {
        Ok(())
    }

    async fn delete(&self, _id: &Uuid) -> Result<(), PatientRepositoryError> {
        Ok(())
    }
}
