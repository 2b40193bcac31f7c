//! Shared classification of pool and Diesel failures.
//!
//! Repositories turn a [`StoreFailure`] into their own port error. Only
//! closed connections and pool checkouts count as connection failures; every
//! other driver error is a query failure, except unique violations, which
//! are surfaced with their constraint name so the visit adapter can detect
//! ticket collisions.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Unique constraint guarding `(ticket_day, ticket_code)` on `visits`.
pub(crate) const TICKET_CODE_CONSTRAINT: &str = "visits_ticket_code_key";

/// Storage failure reduced to what the ports distinguish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreFailure {
    Connection(String),
    Query(String),
    UniqueViolation { constraint: Option<String> },
}

impl StoreFailure {
    /// Whether this is a collision on the ticket code constraint.
    pub(crate) fn is_ticket_collision(&self) -> bool {
        matches!(
            self,
            Self::UniqueViolation { constraint: Some(name) } if name == TICKET_CODE_CONSTRAINT
        )
    }
}

impl From<PoolError> for StoreFailure {
    fn from(error: PoolError) -> Self {
        Self::Connection(error.into_message())
    }
}

impl From<DieselError> for StoreFailure {
    fn from(error: DieselError) -> Self {
        match &error {
            DieselError::DatabaseError(kind, info) => {
                debug!(
                    ?kind,
                    message = info.message(),
                    constraint = info.constraint_name(),
                    "diesel operation failed",
                );
            }
            _ => debug!(error = %error, "diesel operation failed"),
        }

        match error {
            DieselError::NotFound => Self::Query("record not found".to_owned()),
            DieselError::QueryBuilderError(_) => Self::Query("database query error".to_owned()),
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
                Self::Connection("database connection error".to_owned())
            }
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::UniqueViolation {
                    constraint: info.constraint_name().map(str::to_owned),
                }
            }
            _ => Self::Query("database error".to_owned()),
        }
    }
}
