//! Emergency department visits and their clinical workflow.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::Patient;

/// Maximum characters accepted for the presenting complaint.
pub const COMPLAINT_MAX: usize = 500;

/// Hours a ticket stays resolvable after its visit was created.
pub const TICKET_LOOKUP_WINDOW_HOURS: i64 = 24;

/// Start of the ticket lookup window ending at `now`.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use ed_queue::domain::lookup_window_start;
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).single().expect("valid time");
/// let start = lookup_window_start(now);
/// let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).single().expect("valid time");
/// assert_eq!(start, expected);
/// ```
pub fn lookup_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - TimeDelta::hours(TICKET_LOOKUP_WINDOW_HOURS)
}

/// Fixed six-stage workflow a visit moves through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum VisitStage {
    Registered,
    Triage,
    Examination,
    Treatment,
    Observation,
    Discharged,
}

impl VisitStage {
    /// Every stage in workflow order.
    pub const ALL: [Self; 6] = [
        Self::Registered,
        Self::Triage,
        Self::Examination,
        Self::Treatment,
        Self::Observation,
        Self::Discharged,
    ];

    /// The stage that follows this one, or `None` once discharged.
    ///
    /// # Examples
    /// ```
    /// use ed_queue::domain::VisitStage;
    ///
    /// assert_eq!(VisitStage::Registered.next(), Some(VisitStage::Triage));
    /// assert_eq!(VisitStage::Discharged.next(), None);
    /// ```
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Registered => Some(Self::Triage),
            Self::Triage => Some(Self::Examination),
            Self::Examination => Some(Self::Treatment),
            Self::Treatment => Some(Self::Observation),
            Self::Observation => Some(Self::Discharged),
            Self::Discharged => None,
        }
    }

    /// Whether the patient is still in the department.
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Discharged)
    }

    /// Stable storage and wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Triage => "triage",
            Self::Examination => "examination",
            Self::Treatment => "treatment",
            Self::Observation => "observation",
            Self::Discharged => "discharged",
        }
    }
}

impl fmt::Display for VisitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored stage label is not part of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown visit stage: {0}")]
pub struct UnknownVisitStage(pub String);

impl FromStr for VisitStage {
    type Err = UnknownVisitStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownVisitStage(s.to_owned()))
    }
}

/// Validation errors returned by [`Visit::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitValidationError {
    EmptyTicketCode,
    ComplaintTooLong { max: usize },
    UpdatedBeforeCreated,
}

impl fmt::Display for VisitValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTicketCode => write!(f, "ticket code must not be empty"),
            Self::ComplaintTooLong { max } => {
                write!(f, "complaint must be at most {max} characters")
            }
            Self::UpdatedBeforeCreated => {
                write!(f, "visit cannot be updated before it was created")
            }
        }
    }
}

impl std::error::Error for VisitValidationError {}

/// Input for constructing a [`Visit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitDraft {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub ticket_code: String,
    pub ticket_day: NaiveDate,
    pub stage: VisitStage,
    pub complaint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One patient visit ("kunjungan") holding its queue ticket.
///
/// ## Invariants
/// - `ticket_code` is non-empty and never changes after creation; it is
///   unique within `ticket_day`, the local calendar day it was issued for.
/// - `complaint` is trimmed, at most [`COMPLAINT_MAX`] characters, and blank
///   complaints are stored as `None`.
/// - `updated_at >= created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    id: Uuid,
    patient_id: Uuid,
    ticket_code: String,
    ticket_day: NaiveDate,
    stage: VisitStage,
    complaint: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Visit {
    /// Validate a draft into a visit.
    pub fn new(draft: VisitDraft) -> Result<Self, VisitValidationError> {
        if draft.ticket_code.trim().is_empty() {
            return Err(VisitValidationError::EmptyTicketCode);
        }
        if draft.updated_at < draft.created_at {
            return Err(VisitValidationError::UpdatedBeforeCreated);
        }
        let complaint = normalize_complaint(draft.complaint)?;

        Ok(Self {
            id: draft.id,
            patient_id: draft.patient_id,
            ticket_code: draft.ticket_code,
            ticket_day: draft.ticket_day,
            stage: draft.stage,
            complaint,
            created_at: draft.created_at,
            updated_at: draft.updated_at,
        })
    }

    /// Open a fresh visit in the [`VisitStage::Registered`] stage.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use ed_queue::domain::{Visit, VisitStage};
    /// use uuid::Uuid;
    ///
    /// let now = Utc::now();
    /// let visit = Visit::register(
    ///     Uuid::new_v4(),
    ///     Uuid::new_v4(),
    ///     "AS076".to_owned(),
    ///     now.date_naive(),
    ///     Some("  fever  ".to_owned()),
    ///     now,
    /// )
    /// .expect("valid visit");
    /// assert_eq!(visit.stage(), VisitStage::Registered);
    /// assert_eq!(visit.complaint(), Some("fever"));
    /// ```
    pub fn register(
        id: Uuid,
        patient_id: Uuid,
        ticket_code: String,
        ticket_day: NaiveDate,
        complaint: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, VisitValidationError> {
        Self::new(VisitDraft {
            id,
            patient_id,
            ticket_code,
            ticket_day,
            stage: VisitStage::Registered,
            complaint,
            created_at: at,
            updated_at: at,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn patient_id(&self) -> Uuid {
        self.patient_id
    }

    /// Queue ticket printed for the patient.
    pub fn ticket_code(&self) -> &str {
        &self.ticket_code
    }

    /// Local calendar day the ticket was issued for.
    pub fn ticket_day(&self) -> NaiveDate {
        self.ticket_day
    }

    pub fn stage(&self) -> VisitStage {
        self.stage
    }

    pub fn complaint(&self) -> Option<&str> {
        self.complaint.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Copy of this visit moved to `stage` at `at`.
    ///
    /// `at` earlier than the creation time is clamped to it.
    #[must_use]
    pub fn with_stage(&self, stage: VisitStage, at: DateTime<Utc>) -> Self {
        Self {
            stage,
            updated_at: at.max(self.created_at),
            ..self.clone()
        }
    }
}

/// Trim a presenting complaint, dropping blank ones.
///
/// # Errors
/// Returns [`VisitValidationError::ComplaintTooLong`] past [`COMPLAINT_MAX`]
/// characters.
pub fn normalize_complaint(
    raw: Option<String>,
) -> Result<Option<String>, VisitValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > COMPLAINT_MAX {
        return Err(VisitValidationError::ComplaintTooLong { max: COMPLAINT_MAX });
    }
    Ok(Some(trimmed.to_owned()))
}

/// A visit joined with the patient it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitDetails {
    pub visit: Visit,
    pub patient: Patient,
}

#[cfg(test)]
mod tests {
    //! Workflow and validation coverage.

    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn draft(created_at: DateTime<Utc>) -> VisitDraft {
        VisitDraft {
            id: Uuid::nil(),
            patient_id: Uuid::nil(),
            ticket_code: "AS076".to_owned(),
            ticket_day: created_at.date_naive(),
            stage: VisitStage::Registered,
            complaint: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[rstest]
    fn stages_advance_in_workflow_order() {
        let mut stage = VisitStage::Registered;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, VisitStage::ALL);
    }

    #[rstest]
    fn only_discharged_is_inactive() {
        let inactive: Vec<_> = VisitStage::ALL
            .into_iter()
            .filter(|stage| !stage.is_active())
            .collect();
        assert_eq!(inactive, vec![VisitStage::Discharged]);
    }

    #[rstest]
    fn stage_labels_round_trip() {
        for stage in VisitStage::ALL {
            assert_eq!(stage.as_str().parse::<VisitStage>(), Ok(stage));
            let json = serde_json::to_value(stage).expect("serialise stage");
            assert_eq!(json, serde_json::json!(stage.as_str()));
        }
    }

    #[rstest]
    fn unknown_stage_label_is_rejected() {
        assert_eq!(
            "waiting".parse::<VisitStage>(),
            Err(UnknownVisitStage("waiting".to_owned()))
        );
    }

    #[rstest]
    fn blank_complaints_are_dropped(created_at: DateTime<Utc>) {
        let mut draft = draft(created_at);
        draft.complaint = Some("   ".to_owned());
        let visit = Visit::new(draft).expect("valid visit");
        assert!(visit.complaint().is_none());
    }

    #[rstest]
    fn overlong_complaints_are_rejected(created_at: DateTime<Utc>) {
        let mut draft = draft(created_at);
        draft.complaint = Some("x".repeat(COMPLAINT_MAX + 1));
        assert_eq!(
            Visit::new(draft),
            Err(VisitValidationError::ComplaintTooLong { max: COMPLAINT_MAX })
        );
    }

    #[rstest]
    fn empty_ticket_codes_are_rejected(created_at: DateTime<Utc>) {
        let mut draft = draft(created_at);
        draft.ticket_code = String::new();
        assert_eq!(Visit::new(draft), Err(VisitValidationError::EmptyTicketCode));
    }

    #[rstest]
    fn updates_cannot_precede_creation(created_at: DateTime<Utc>) {
        let mut draft = draft(created_at);
        draft.updated_at = created_at - TimeDelta::seconds(1);
        assert_eq!(
            Visit::new(draft),
            Err(VisitValidationError::UpdatedBeforeCreated)
        );
    }

    #[rstest]
    fn with_stage_touches_updated_at(created_at: DateTime<Utc>) {
        let visit = Visit::new(draft(created_at)).expect("valid visit");
        let later = created_at + TimeDelta::minutes(5);
        let moved = visit.with_stage(VisitStage::Triage, later);
        assert_eq!(moved.stage(), VisitStage::Triage);
        assert_eq!(moved.updated_at(), later);
        assert_eq!(moved.ticket_code(), visit.ticket_code());
    }

    #[rstest]
    fn lookup_window_spans_a_day(created_at: DateTime<Utc>) {
        assert_eq!(
            lookup_window_start(created_at),
            created_at - TimeDelta::hours(24)
        );
    }
}
