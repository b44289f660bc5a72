//! Evaluations and appointments.
//!
//! Both live in the `appointments` table and belong to a login account (`user_id`). An
//! evaluation is a row with a result and no date; an appointment is a row with a date and an
//! optional result. The result is arbitrary JSON kept as text.

use crate::db::{Database, UnitOfWork};
use crate::dto::{AppointmentDetailsRes, AppointmentListingRes, AppointmentRes};
use crate::error::{PatientError, PatientResult};
use crate::repositories::now_timestamp;
use crate::repositories::patients::load_profile;
use crate::validation::{parse_calendar_date, storage_date, validate_id, validate_program_name};
use crate::{format_national_id, format_phone_number};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Row};
use serde_json::Value;
use std::sync::Arc;

const APPOINTMENT_COLUMNS: &str = "id, user_id, program_name, result_program, appointment_date";

/// Service for evaluations and appointments.
#[derive(Clone)]
pub struct AppointmentService {
    db: Arc<Database>,
}

impl AppointmentService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stores an evaluation result without an appointment date.
    ///
    /// # Arguments
    ///
    /// * `account_id` - Login account the evaluation belongs to.
    /// * `program_name` - Name of the screening program.
    /// * `result` - Evaluation payload; must not be JSON `null`.
    ///
    /// # Returns
    ///
    /// The new row id.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` for a blank program name or a null result, and
    /// `PatientError::NotFound` if the account does not exist.
    pub fn record_evaluation(
        &self,
        account_id: i64,
        program_name: &str,
        result: &Value,
    ) -> PatientResult<i64> {
        if result.is_null() {
            return Err(PatientError::InvalidInput(
                "result_program is required".into(),
            ));
        }
        self.insert(account_id, program_name, Some(result), None)
    }

    /// Schedules an appointment, optionally carrying an evaluation result.
    ///
    /// `appointment_date` accepts `YYYY-MM-DD`, `DD/MM/YYYY` or an RFC 3339 timestamp and is
    /// stored as `YYYY-MM-DD`. A JSON `null` result is stored as no result.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` for a blank program name or an unparseable date,
    /// and `PatientError::NotFound` if the account does not exist.
    pub fn schedule_appointment(
        &self,
        account_id: i64,
        program_name: &str,
        appointment_date: &str,
        result: Option<&Value>,
    ) -> PatientResult<i64> {
        let date = parse_calendar_date("appointment_date", appointment_date)?;
        let result = result.filter(|value| !value.is_null());
        self.insert(account_id, program_name, result, Some(date))
    }

    fn insert(
        &self,
        account_id: i64,
        program_name: &str,
        result: Option<&Value>,
        date: Option<NaiveDate>,
    ) -> PatientResult<i64> {
        validate_id("user_id", account_id)?;
        let program_name = validate_program_name(program_name)?;
        let result = result
            .map(serde_json::to_string)
            .transpose()
            .map_err(PatientError::ResultEncoding)?;
        let date = date.map(storage_date);

        self.db.with_transaction(|uow| {
            ensure_account(uow, account_id)?;
            let id = uow.insert(
                "INSERT INTO appointments \
                 (user_id, program_name, result_program, appointment_date, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![account_id, program_name, result, date, now_timestamp()],
            )?;

            match &date {
                Some(date) => tracing::info!(
                    "scheduled appointment {} for account {} on {}",
                    id,
                    account_id,
                    date
                ),
                None => tracing::info!("recorded evaluation {} for account {}", id, account_id),
            }
            Ok(id)
        })
    }

    /// Returns the account's appointment with the latest date, if any.
    ///
    /// Ties on date go to the most recently created row. Evaluations without a date are never
    /// returned. An unknown account simply has no appointments.
    pub fn list_upcoming(&self, account_id: i64) -> PatientResult<Option<AppointmentRes>> {
        validate_id("user_id", account_id)?;
        self.db.with_transaction(|uow| {
            uow.query_optional(
                &format!(
                    "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
                     WHERE user_id = ?1 AND appointment_date IS NOT NULL \
                     ORDER BY appointment_date DESC, id DESC LIMIT 1"
                ),
                params![account_id],
                appointment_from_row,
            )
        })
    }

    /// Returns every dated appointment of the account, latest date first.
    pub fn list_all(&self, account_id: i64) -> PatientResult<Vec<AppointmentRes>> {
        validate_id("user_id", account_id)?;
        self.db.with_transaction(|uow| {
            uow.query_many(
                &format!(
                    "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
                     WHERE user_id = ?1 AND appointment_date IS NOT NULL \
                     ORDER BY appointment_date DESC, id DESC"
                ),
                params![account_id],
                appointment_from_row,
            )
        })
    }

    /// Returns every dated appointment across all accounts with the owning patient's contact
    /// details, earliest date first.
    pub fn list_all_with_details(&self) -> PatientResult<Vec<AppointmentListingRes>> {
        self.db.with_transaction(|uow| {
            uow.query_many(
                "SELECT a.id, a.user_id, a.program_name, a.result_program, a.appointment_date, \
                        p.id, p.title_name, p.first_name, p.last_name, p.id_card, p.phone \
                 FROM appointments a \
                 JOIN users u ON u.id = a.user_id \
                 JOIN patient p ON p.id_card = u.id_card \
                 WHERE a.appointment_date IS NOT NULL \
                 ORDER BY a.appointment_date ASC, a.id ASC",
                [],
                |row| {
                    Ok(AppointmentListingRes {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        program_name: row.get(2)?,
                        result_program: result_from_column(row, 3)?,
                        appointment_date: row.get(4)?,
                        patient_id: row.get(5)?,
                        title_name: row.get(6)?,
                        first_name: row.get(7)?,
                        last_name: row.get(8)?,
                        id_card: format_national_id(&row.get::<_, String>(9)?),
                        phone: format_phone_number(&row.get::<_, String>(10)?),
                    })
                },
            )
        })
    }

    /// Returns one appointment together with the full profile of its patient.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` if the appointment, or the patient behind its account,
    /// does not exist.
    pub fn get_details(&self, appointment_id: i64) -> PatientResult<AppointmentDetailsRes> {
        self.db.with_transaction(|uow| {
            let appointment = uow.query_one(
                &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
                params![appointment_id],
                &format!("appointment {appointment_id}"),
                appointment_from_row,
            )?;
            let patient_id: i64 = uow.query_one(
                "SELECT p.id FROM users u JOIN patient p ON p.id_card = u.id_card WHERE u.id = ?1",
                params![appointment.user_id],
                &format!("patient for appointment {appointment_id}"),
                |row| row.get(0),
            )?;
            let patient = load_profile(uow, patient_id)?;

            Ok(AppointmentDetailsRes {
                appointment,
                patient,
            })
        })
    }

    /// Deletes an appointment or evaluation.
    ///
    /// Deleting an id that does not exist succeeds without effect.
    ///
    /// # Returns
    ///
    /// `true` if a row was removed.
    pub fn delete(&self, appointment_id: i64) -> PatientResult<bool> {
        self.db.with_transaction(|uow| {
            let deleted = uow.execute(
                "DELETE FROM appointments WHERE id = ?1",
                params![appointment_id],
            )?;
            if deleted == 0 {
                tracing::debug!("appointment {} already absent", appointment_id);
            } else {
                tracing::info!("deleted appointment {}", appointment_id);
            }
            Ok(deleted > 0)
        })
    }
}

fn ensure_account(uow: &UnitOfWork<'_>, account_id: i64) -> PatientResult<()> {
    uow.query_one(
        "SELECT id FROM users WHERE id = ?1",
        params![account_id],
        &format!("account {account_id}"),
        |row| row.get::<_, i64>(0),
    )
    .map(|_| ())
}

fn appointment_from_row(row: &Row<'_>) -> rusqlite::Result<AppointmentRes> {
    Ok(AppointmentRes {
        id: row.get(0)?,
        user_id: row.get(1)?,
        program_name: row.get(2)?,
        result_program: result_from_column(row, 3)?,
        appointment_date: row.get(4)?,
    })
}

fn result_from_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Value>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| {
            serde_json::from_str(&text)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}
