//! Shared validation helpers for inbound HTTP adapters.

use serde_json::json;
use uuid::Uuid;

use crate::domain::Error;

/// Machine-readable reason attached to validation error details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
        }
    }
}

/// Wire name of a request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    Error::invalid_request(format!("missing required field: {field}")).with_details(json!({
        "field": field,
        "code": ErrorCode::MissingField.as_str(),
    }))
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    let field = field.as_str();
    Error::invalid_request(format!("{field} must be a valid UUID")).with_details(json!({
        "field": field,
        "value": value,
        "code": ErrorCode::InvalidUuid.as_str(),
    }))
}

pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|_| invalid_uuid_error(field, value))
}

/// Require an optional field to be present and not blank.
pub(crate) fn require_text(value: Option<String>, field: FieldName) -> Result<String, Error> {
    value
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| missing_field_error(field))
}
