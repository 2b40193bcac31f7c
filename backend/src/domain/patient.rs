//! Patient registration data.
//!
//! A patient is registered with the display name used for the ticket
//! initials and the contact details of the accompanying guardian.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Maximum characters accepted for patient and guardian names.
pub const NAME_MAX: usize = 100;
const PHONE_MIN_DIGITS: usize = 8;
const PHONE_MAX_DIGITS: usize = 15;

/// Validation errors returned by [`Patient::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatientValidationError {
    EmptyName,
    NameTooLong { max: usize },
    EmptyGuardianName,
    GuardianNameTooLong { max: usize },
    InvalidGuardianPhone,
}

impl fmt::Display for PatientValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "patient name must not be empty"),
            Self::NameTooLong { max } => {
                write!(f, "patient name must be at most {max} characters")
            }
            Self::EmptyGuardianName => write!(f, "guardian name must not be empty"),
            Self::GuardianNameTooLong { max } => {
                write!(f, "guardian name must be at most {max} characters")
            }
            Self::InvalidGuardianPhone => write!(
                f,
                "guardian phone must contain {PHONE_MIN_DIGITS} to {PHONE_MAX_DIGITS} digits",
            ),
        }
    }
}

impl std::error::Error for PatientValidationError {}

/// Unvalidated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientDraft {
    pub name: String,
    pub guardian_name: String,
    pub guardian_phone: String,
}

/// Registered patient.
///
/// ## Invariants
/// - `name` and `guardian_name` are trimmed, non-empty, and at most
///   [`NAME_MAX`] characters.
/// - `guardian_phone` holds 8 to 15 digits with an optional leading `+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    id: Uuid,
    name: String,
    guardian_name: String,
    guardian_phone: String,
    created_at: DateTime<Utc>,
}

impl Patient {
    /// Validate a draft into a patient record.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use ed_queue::domain::{Patient, PatientDraft};
    /// use uuid::Uuid;
    ///
    /// let patient = Patient::new(
    ///     Uuid::new_v4(),
    ///     PatientDraft {
    ///         name: " Asep Sunandar ".to_owned(),
    ///         guardian_name: "Euis".to_owned(),
    ///         guardian_phone: "0812-3456-7890".to_owned(),
    ///     },
    ///     Utc::now(),
    /// )
    /// .expect("valid patient");
    /// assert_eq!(patient.name(), "Asep Sunandar");
    /// assert_eq!(patient.guardian_phone(), "081234567890");
    /// ```
    pub fn new(
        id: Uuid,
        draft: PatientDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PatientValidationError> {
        let name = bounded_name(
            &draft.name,
            PatientValidationError::EmptyName,
            PatientValidationError::NameTooLong { max: NAME_MAX },
        )?;
        let guardian_name = bounded_name(
            &draft.guardian_name,
            PatientValidationError::EmptyGuardianName,
            PatientValidationError::GuardianNameTooLong { max: NAME_MAX },
        )?;
        let guardian_phone = normalize_phone(&draft.guardian_phone)
            .ok_or(PatientValidationError::InvalidGuardianPhone)?;

        Ok(Self {
            id,
            name,
            guardian_name,
            guardian_phone,
            created_at,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Display name, also the source of ticket initials.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn guardian_name(&self) -> &str {
        &self.guardian_name
    }

    /// Normalised phone number: digits with an optional leading `+`.
    pub fn guardian_phone(&self) -> &str {
        &self.guardian_phone
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn bounded_name(
    raw: &str,
    empty: PatientValidationError,
    too_long: PatientValidationError,
) -> Result<String, PatientValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(empty);
    }
    if trimmed.chars().count() > NAME_MAX {
        return Err(too_long);
    }
    Ok(trimmed.to_owned())
}

fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (prefix, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' => {}
            _ => return None,
        }
    }

    (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS)
        .contains(&digits.len())
        .then(|| format!("{prefix}{digits}"))
}
