//! HTTP mapping for domain errors.
//!
//! Keeps the domain error type transport agnostic while giving Actix
//! handlers consistent JSON bodies and status codes.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::error;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

pub use crate::domain::ApiResult;

const REDACTED_MESSAGE: &str = "Internal server error";

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if error.code() == ErrorCode::InternalError {
        let redacted = Error::internal(REDACTED_MESSAGE);
        match error.trace_id() {
            Some(id) => redacted.with_trace_id(id),
            None => redacted,
        }
    } else {
        error.clone()
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        if self.code() == ErrorCode::InternalError {
            error!(message = self.message(), trace_id = ?self.trace_id(), "request failed");
        }
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(redact_if_internal(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Error::internal(REDACTED_MESSAGE)
    }
}

#[cfg(test)]
mod tests;
