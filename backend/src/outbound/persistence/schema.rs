//! Diesel table definitions.
//!
//! Must match `backend/migrations`; regenerate with `diesel print-schema`
//! after changing a migration.

diesel::table! {
    /// Registered patients and their guardians.
    patients (id) {
        id -> Uuid,
        name -> Varchar,
        guardian_name -> Varchar,
        guardian_phone -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Emergency-department visits.
    ///
    /// `(ticket_day, ticket_code)` is unique under `visits_ticket_code_key`.
    visits (id) {
        id -> Uuid,
        patient_id -> Uuid,
        ticket_code -> Varchar,
        /// Local calendar day the ticket sequence belongs to.
        ticket_day -> Date,
        /// One of the six workflow stages, snake_case.
        stage -> Varchar,
        complaint -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(visits -> patients (patient_id));

diesel::allow_tables_to_appear_in_same_query!(patients, visits);
