//! Input validation utilities.
//!
//! This module contains functions for validating user inputs at the service boundary so that
//! only normalised values reach storage.

use crate::{PatientError, PatientResult};
use chrono::{DateTime, NaiveDate};

/// Longest password accepted, in bytes. Argon2 handles longer input, this just bounds work.
pub const MAX_PASSWORD_LEN: usize = 1024;

/// Longest free-text program name accepted.
pub const MAX_PROGRAM_NAME_LEN: usize = 200;

/// Parses a calendar date supplied by a client and returns it in storage form.
///
/// Accepted shapes:
/// - ISO calendar date: `2024-05-31`
/// - day/month/year: `31/05/2024` or `1/5/2024`
/// - RFC 3339 timestamp: `2024-05-31T00:00:00.000Z` (the date part in the given offset is kept)
///
/// # Errors
///
/// Returns `PatientError::InvalidInput` naming `field` if the value matches none of the shapes
/// or is not a real date.
pub fn parse_calendar_date(field: &str, input: &str) -> PatientResult<NaiveDate> {
    let value = input.trim();
    if value.is_empty() {
        return Err(PatientError::InvalidInput(format!("{field} is required")));
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if value.contains('/') {
        if let Ok(date) = NaiveDate::parse_from_str(value, "%d/%m/%Y") {
            return Ok(date);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.date_naive());
    }

    Err(PatientError::InvalidInput(format!(
        "{field} must be YYYY-MM-DD or DD/MM/YYYY, got {value:?}"
    )))
}

/// Formats a date the way it is stored (`YYYY-MM-DD`).
pub fn storage_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Rejects empty and oversized passwords. Whitespace is significant and kept as-is.
pub fn validate_password(password: &str) -> PatientResult<()> {
    if password.is_empty() {
        return Err(PatientError::InvalidInput("password is required".into()));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(PatientError::InvalidInput(format!(
            "password exceeds maximum length of {} bytes",
            MAX_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Trims a program name and checks it is present and bounded.
pub fn validate_program_name(program_name: &str) -> PatientResult<String> {
    let trimmed = program_name.trim();
    if trimmed.is_empty() {
        return Err(PatientError::InvalidInput("program_name is required".into()));
    }
    if trimmed.chars().count() > MAX_PROGRAM_NAME_LEN {
        return Err(PatientError::InvalidInput(format!(
            "program_name exceeds maximum length of {} characters",
            MAX_PROGRAM_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Rejects non-positive ids before they reach a query.
pub fn validate_id(field: &str, id: i64) -> PatientResult<()> {
    if id <= 0 {
        return Err(PatientError::InvalidInput(format!(
            "{field} must be a positive integer"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(
            parse_calendar_date("appointment_date", "2024-05-31").unwrap(),
            ymd(2024, 5, 31)
        );
    }

    #[test]
    fn test_parse_day_month_year() {
        assert_eq!(
            parse_calendar_date("appointment_date", "31/05/2024").unwrap(),
            ymd(2024, 5, 31)
        );
        assert_eq!(
            parse_calendar_date("appointment_date", " 1/5/2024 ").unwrap(),
            ymd(2024, 5, 1)
        );
    }

    #[test]
    fn test_parse_rfc3339_keeps_local_date() {
        assert_eq!(
            parse_calendar_date("date_birth", "1990-01-15T00:00:00.000+07:00").unwrap(),
            ymd(1990, 1, 15)
        );
    }

    #[test]
    fn test_parse_rejects_impossible_and_garbage_dates() {
        for input in ["31/02/2024", "2024-13-01", "tomorrow", "", "05/31/2024"] {
            let err = parse_calendar_date("appointment_date", input)
                .expect_err("invalid date should fail");
            assert!(matches!(err, PatientError::InvalidInput(_)), "{input}");
        }
    }

    #[test]
    fn test_storage_date_is_iso() {
        assert_eq!(storage_date(ymd(2024, 1, 2)), "2024-01-02");
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password(" pass word ").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LEN + 1)).is_err());
    }

    #[test]
    fn test_program_name_is_trimmed_and_required() {
        assert_eq!(
            validate_program_name("  Diabetes screening ").unwrap(),
            "Diabetes screening"
        );
        assert!(validate_program_name("   ").is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("user_id", 1).is_ok());
        assert!(validate_id("user_id", 0).is_err());
    }
}
