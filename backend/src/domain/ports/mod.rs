//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod patient_repository;
mod visit_command;
mod visit_query;
mod visit_repository;

#[cfg(test)]
pub use patient_repository::MockPatientRepository;
pub use patient_repository::{
    FixturePatientRepository, PatientRepository, PatientRepositoryError,
};
#[cfg(test)]
pub use visit_command::MockVisitCommand;
pub use visit_command::{
    AdvanceVisitRequest, CreateVisitRequest, FixtureVisitCommand, VisitCommand, VisitView,
};
#[cfg(test)]
pub use visit_query::MockVisitQuery;
pub use visit_query::{
    EncodedTicket, FixtureVisitQuery, QueueSummary, TicketRequest, TicketValidation, VisitQuery,
};
#[cfg(test)]
pub use visit_repository::MockVisitRepository;
pub use visit_repository::{
    FixtureVisitRepository, StageCount, VisitRepository, VisitRepositoryError,
};
