//! Internal Diesel row structs.
//!
//! Rows never leave the persistence layer; repositories convert them into
//! domain records and re-run domain validation on the way out.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{Patient, PatientDraft, Visit, VisitDetails, VisitDraft, VisitStage};

use super::schema::{patients, visits};

/// Row read from `patients`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = patients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PatientRow {
    pub id: Uuid,
    pub name: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub created_at: DateTime<Utc>,
}

/// Insertable patient.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = patients)]
pub(crate) struct NewPatientRow<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub guardian_name: &'a str,
    pub guardian_phone: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a Patient> for NewPatientRow<'a> {
    fn from(patient: &'a Patient) -> Self {
        Self {
            id: patient.id(),
            name: patient.name(),
            guardian_name: patient.guardian_name(),
            guardian_phone: patient.guardian_phone(),
            created_at: patient.created_at(),
        }
    }
}

/// Row read from `visits`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = visits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct VisitRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub ticket_code: String,
    pub ticket_day: NaiveDate,
    pub stage: String,
    pub complaint: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable visit.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = visits)]
pub(crate) struct NewVisitRow<'a> {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub ticket_code: &'a str,
    pub ticket_day: NaiveDate,
    pub stage: &'static str,
    pub complaint: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a Visit> for NewVisitRow<'a> {
    fn from(visit: &'a Visit) -> Self {
        Self {
            id: visit.id(),
            patient_id: visit.patient_id(),
            ticket_code: visit.ticket_code(),
            ticket_day: visit.ticket_day(),
            stage: visit.stage().as_str(),
            complaint: visit.complaint(),
            created_at: visit.created_at(),
            updated_at: visit.updated_at(),
        }
    }
}

/// Changeset applied when a visit moves to its next stage.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = visits)]
pub(crate) struct StageUpdate {
    pub stage: &'static str,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = String;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let id = row.id;
        Patient::new(
            row.id,
            PatientDraft {
                name: row.name,
                guardian_name: row.guardian_name,
                guardian_phone: row.guardian_phone,
            },
            row.created_at,
        )
        .map_err(|err| format!("stored patient {id} is invalid: {err}"))
    }
}

impl TryFrom<VisitRow> for Visit {
    type Error = String;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let stage: VisitStage = row
            .stage
            .parse()
            .map_err(|err| format!("stored visit {id} is invalid: {err}"))?;
        Visit::new(VisitDraft {
            id: row.id,
            patient_id: row.patient_id,
            ticket_code: row.ticket_code,
            ticket_day: row.ticket_day,
            stage,
            complaint: row.complaint,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .map_err(|err| format!("stored visit {id} is invalid: {err}"))
    }
}

/// Convert a joined `(visit, patient)` row pair.
pub(crate) fn details_from_rows(
    (visit, patient): (VisitRow, PatientRow),
) -> Result<VisitDetails, String> {
    Ok(VisitDetails {
        visit: visit.try_into()?,
        patient: patient.try_into()?,
    })
}

#[cfg(test)]
mod tests {
    //! Row conversion coverage.

    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn visit_row(at: DateTime<Utc>, stage: &str) -> VisitRow {
        VisitRow {
            id: Uuid::nil(),
            patient_id: Uuid::nil(),
            ticket_code: "AS001".to_owned(),
            ticket_day: at.date_naive(),
            stage: stage.to_owned(),
            complaint: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[rstest]
    fn visit_row_round_trips_stage(at: DateTime<Utc>) {
        let visit = Visit::try_from(visit_row(at, "examination")).expect("valid row");
        assert_eq!(visit.stage(), VisitStage::Examination);

        let row = NewVisitRow::from(&visit);
        assert_eq!(row.stage, "examination");
        assert_eq!(row.ticket_day, at.date_naive());
    }

    #[rstest]
    fn unknown_stage_is_reported(at: DateTime<Utc>) {
        let err = Visit::try_from(visit_row(at, "waiting")).expect_err("unknown stage");
        assert!(err.contains("waiting"));
    }

    #[rstest]
    fn invalid_patient_row_is_reported(at: DateTime<Utc>) {
        let row = PatientRow {
            id: Uuid::nil(),
            name: "   ".to_owned(),
            guardian_name: "Euis".to_owned(),
            guardian_phone: "08123456789".to_owned(),
            created_at: at,
        };
        let err = Patient::try_from(row).expect_err("blank name");
        assert!(err.starts_with("stored patient"));
    }
}
