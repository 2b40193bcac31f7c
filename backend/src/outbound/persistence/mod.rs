//! PostgreSQL persistence adapters using Diesel.
//!
//! Repositories are thin translators between row structs and domain
//! records; they hold no business rules. Row models and the schema are
//! private to this module.
//!
//! # Example
//!
//! ```no_run
//! # async fn wire() -> Result<(), ed_queue::outbound::persistence::PoolError> {
//! use ed_queue::outbound::persistence::{DbPool, DieselVisitRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/igd")).await?;
//! let visits = DieselVisitRepository::new(pool);
//! # let _ = visits;
//! # Ok(())
//! # }
//! ```

mod diesel_error_mapping;
mod diesel_patient_repository;
mod diesel_visit_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_patient_repository::DieselPatientRepository;
pub use diesel_visit_repository::DieselVisitRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
