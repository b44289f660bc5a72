//! JSON request and response bodies.
//!
//! Field names follow the snake_case column names the outreach client already sends
//! (`id_card`, `date_birth`, `result_program`, ...). Identity numbers and phone numbers are
//! accepted with or without hyphens and always returned in display form.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Generic success message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

impl MessageRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub message: String,
    /// Opaque cause string; present only for internal failures and rejected input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Demographic and biometric fields shared by registration and profile updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientFields {
    pub title_name: String,
    pub first_name: String,
    pub last_name: String,
    /// 13-digit identity number, hyphens allowed.
    pub id_card: String,
    /// 10-digit phone number, hyphens allowed.
    pub phone: String,
    pub gender: String,
    /// `YYYY-MM-DD`, `DD/MM/YYYY` or an RFC 3339 timestamp.
    pub date_birth: String,
    #[serde(default)]
    pub house_number: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub village: String,
    #[serde(default)]
    pub subdistrict: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub province: String,
    /// Kilograms.
    pub weight: f64,
    /// Centimetres.
    pub height: f64,
    /// Centimetres.
    pub waist: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    #[serde(flatten)]
    pub profile: PatientFields,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientRes {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub id_card: String,
    pub password: String,
}

/// Who just logged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    /// Patient id, as a string.
    pub id: String,
    /// Account id used to book appointments.
    pub account_id: i64,
    pub title_name: String,
    pub first_name: String,
    pub last_name: String,
}

/// Patient profile with the most recent health metrics, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProfileRes {
    pub id: i64,
    pub account_id: Option<i64>,
    pub title_name: String,
    pub first_name: String,
    pub last_name: String,
    /// Display form, `X-XXXX-XXXXX-XX-X`.
    pub id_card: String,
    /// Display form, `XXX-XXX-XXXX`.
    pub phone: String,
    pub gender: String,
    pub date_birth: String,
    pub house_number: String,
    pub street: String,
    pub village: String,
    pub subdistrict: String,
    pub district: String,
    pub province: String,
    pub weight: f64,
    pub height: f64,
    pub waist: f64,
    pub bmi: Option<f64>,
    pub waist_to_height_ratio: Option<f64>,
    pub record_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileReq {
    #[serde(flatten)]
    pub profile: PatientFields,
    /// New password; omitted or null keeps the current one.
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateHealthReq {
    pub weight: f64,
    pub height: f64,
    pub waist: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordReq {
    pub password: String,
}

/// Scored evaluation without an appointment date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EvaluationResultReq {
    pub user_id: i64,
    pub program_name: String,
    #[schema(value_type = Object)]
    pub result_program: Value,
}

/// Appointment that may also carry an evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateAppointmentWithResultReq {
    pub user_id: i64,
    pub program_name: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub result_program: Option<Value>,
    /// `YYYY-MM-DD`, `DD/MM/YYYY` or an RFC 3339 timestamp.
    pub appointment_date: String,
}

/// Appointment booked ahead of any evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateAppointmentReq {
    pub user_id: i64,
    pub program_name: String,
    /// `YYYY-MM-DD`, `DD/MM/YYYY` or an RFC 3339 timestamp.
    pub appointment_date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentIdRes {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentRes {
    pub id: i64,
    pub user_id: i64,
    pub program_name: String,
    #[schema(value_type = Option<Object>)]
    pub result_program: Option<Value>,
    /// ISO calendar date; absent for evaluation-only records.
    pub appointment_date: Option<String>,
}

/// A scheduled appointment with the patient it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentListingRes {
    pub id: i64,
    pub user_id: i64,
    pub program_name: String,
    #[schema(value_type = Option<Object>)]
    pub result_program: Option<Value>,
    pub appointment_date: String,
    pub patient_id: i64,
    pub title_name: String,
    pub first_name: String,
    pub last_name: String,
    /// Display form.
    pub id_card: String,
    /// Display form.
    pub phone: String,
}

/// One appointment with the full patient profile and latest metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppointmentDetailsRes {
    pub appointment: AppointmentRes,
    pub patient: ProfileRes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_patient_req_reads_flat_body() {
        let body = serde_json::json!({
            "title_name": "นาย",
            "first_name": "Somchai",
            "last_name": "Jaidee",
            "id_card": "1-2345-67890-12-3",
            "phone": "081-234-5678",
            "gender": "male",
            "date_birth": "1980-02-01",
            "weight": 70.0,
            "height": 175.0,
            "waist": 80.0,
            "password": "secret"
        });

        let req: CreatePatientReq =
            serde_json::from_value(body).expect("flat body should deserialize");
        assert_eq!(req.profile.first_name, "Somchai");
        assert_eq!(req.profile.province, "");
        assert_eq!(req.password, "secret");
    }

    #[test]
    fn test_update_profile_req_password_is_optional() {
        let body = serde_json::json!({
            "title_name": "นาง",
            "first_name": "Malee",
            "last_name": "Dee",
            "id_card": "1111111111111",
            "phone": "0812345678",
            "gender": "female",
            "date_birth": "01/02/1985",
            "weight": 55.5,
            "height": 160.0,
            "waist": 70.0
        });

        let req: UpdateProfileReq =
            serde_json::from_value(body).expect("body without password should deserialize");
        assert_eq!(req.password, None);
    }

    #[test]
    fn test_error_res_omits_missing_cause() {
        let json = serde_json::to_value(ErrorRes {
            message: "Invalid ID Card or Password".into(),
            error: None,
        })
        .expect("serialize should succeed");
        assert_eq!(json, serde_json::json!({"message": "Invalid ID Card or Password"}));
    }
}
