//! Domain primitives, aggregates, and services.
//!
//! Purpose: define the strongly typed entities of the emergency-department
//! queue (patients, visits, ticket codes) and the services that drive them.
//! Types are transport agnostic; adapters live under `inbound` and
//! `outbound`.
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and stable error identifier.
//! - Patient, Visit, VisitStage: registration and workflow records.
//! - ticket: ticket codes, the public token codec, and the sequencer.
//! - VisitService: implementation of the visit driving ports.

pub mod error;
mod hashid;
mod initials;
mod patient;
pub mod ports;
mod retry;
pub mod ticket;
mod trace_id;
mod visit;
mod visit_service;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::hashid::HashId;
pub use self::initials::{FALLBACK_INITIALS, derive_initials};
pub use self::patient::{NAME_MAX, Patient, PatientDraft, PatientValidationError};
pub use self::retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::visit::{
    COMPLAINT_MAX, TICKET_LOOKUP_WINDOW_HOURS, UnknownVisitStage, Visit, VisitDetails,
    VisitDraft, VisitStage, VisitValidationError, lookup_window_start, normalize_complaint,
};
pub use self::visit_service::{VisitService, VisitServiceConfig};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use ed_queue::domain::{ApiResult, Error};
///
/// fn lookup() -> ApiResult<()> {
///     Err(Error::not_found("ticket not found or expired"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
