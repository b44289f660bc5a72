//! HTTP handlers.
//!
//! Each handler parses the request, moves the blocking storage call onto the blocking pool with
//! [`run_blocking`], and maps the outcome through [`ApiError`].

use crate::error::ApiError;
use crate::{ApiDoc, AppState};
use api_shared::{
    AppointmentDetailsRes, AppointmentIdRes, AppointmentListingRes, AppointmentRes,
    ChangePasswordReq, CreateAppointmentReq, CreateAppointmentWithResultReq, CreatePatientReq,
    CreatePatientRes, ErrorRes, EvaluationResultReq, HealthRes, HealthService, LoginReq, LoginRes,
    MessageRes, ProfileRes, UpdateHealthReq, UpdateProfileReq,
};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use outreach_core::PatientResult;
use std::collections::BTreeSet;
use utoipa::OpenApi;

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type PathParam<T> = Result<Path<T>, PathRejection>;

/// Runs a blocking core call off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> PatientResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Storage is reachable", body = HealthRes),
        (status = 500, description = "Storage is unreachable", body = HealthRes)
    )
)]
/// Health check endpoint
///
/// Pings the database so that a broken storage backend shows up in monitoring.
#[axum::debug_handler]
pub(crate) async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthRes>) {
    let db = state.services.db.clone();
    match run_blocking(move || db.ping()).await {
        Ok(()) => (StatusCode::OK, Json(HealthService::ready())),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthService::unavailable()),
        ),
    }
}

#[utoipa::path(
    post,
    path = "/create-patient",
    request_body = CreatePatientReq,
    responses(
        (status = 201, description = "Patient registered", body = CreatePatientRes),
        (status = 400, description = "Missing or malformed field", body = ErrorRes),
        (status = 409, description = "Identity number already registered", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Register a patient
///
/// Creates the login account, the patient profile and the first health-metrics row in one
/// transaction.
///
/// # Errors
/// Returns `409 Conflict` if an account already exists for the identity number.
#[axum::debug_handler]
pub(crate) async fn create_patient(
    State(state): State<AppState>,
    payload: JsonBody<CreatePatientReq>,
) -> Result<(StatusCode, Json<CreatePatientRes>), ApiError> {
    let Json(req) = payload?;
    let patients = state.services.patients.clone();
    let id = run_blocking(move || patients.create_patient(&req)).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePatientRes {
            message: "Patient registered successfully".into(),
            id,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Credentials accepted", body = LoginRes),
        (status = 401, description = "Invalid identity number or password", body = ErrorRes)
    )
)]
/// Log in with identity number and password
#[axum::debug_handler]
pub(crate) async fn login(
    State(state): State<AppState>,
    payload: JsonBody<LoginReq>,
) -> Result<Json<LoginRes>, ApiError> {
    let Json(req) = payload?;
    let identity = state.services.identity.clone();
    let res = run_blocking(move || identity.login(&req.id_card, &req.password)).await?;
    Ok(Json(res))
}

#[utoipa::path(
    get,
    path = "/profile/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient profile with latest metrics", body = ProfileRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
/// Read a patient profile
///
/// Identity and phone numbers are returned in display form.
#[axum::debug_handler]
pub(crate) async fn get_profile(
    State(state): State<AppState>,
    id: PathParam<i64>,
) -> Result<Json<ProfileRes>, ApiError> {
    let Path(id) = id?;
    let patients = state.services.patients.clone();
    let profile = run_blocking(move || patients.get_profile(id)).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/profile/{id}",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = UpdateProfileReq,
    responses(
        (status = 200, description = "Profile updated", body = MessageRes),
        (status = 400, description = "Missing or malformed field", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes),
        (status = 409, description = "Identity number belongs to another account", body = ErrorRes)
    )
)]
/// Replace a patient profile
///
/// A changed identity number follows through to the login account in the same transaction.
#[axum::debug_handler]
pub(crate) async fn update_profile(
    State(state): State<AppState>,
    id: PathParam<i64>,
    payload: JsonBody<UpdateProfileReq>,
) -> Result<Json<MessageRes>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let patients = state.services.patients.clone();
    run_blocking(move || patients.update_profile(id, &req)).await?;
    Ok(Json(MessageRes::new("Profile updated successfully")))
}

#[utoipa::path(
    put,
    path = "/profile/{id}/health",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = UpdateHealthReq,
    responses(
        (status = 200, description = "Measurements updated", body = MessageRes),
        (status = 400, description = "Non-positive measurement", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
/// Replace weight, height and waist and recompute the metrics
#[axum::debug_handler]
pub(crate) async fn update_health(
    State(state): State<AppState>,
    id: PathParam<i64>,
    payload: JsonBody<UpdateHealthReq>,
) -> Result<Json<MessageRes>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let patients = state.services.patients.clone();
    run_blocking(move || patients.update_health(id, &req)).await?;
    Ok(Json(MessageRes::new("Health data updated successfully")))
}

#[utoipa::path(
    put,
    path = "/profile/{id}/password",
    params(("id" = i64, Path, description = "Patient id")),
    request_body = ChangePasswordReq,
    responses(
        (status = 200, description = "Password changed", body = MessageRes),
        (status = 400, description = "Empty password", body = ErrorRes),
        (status = 404, description = "Patient not found", body = ErrorRes)
    )
)]
/// Change the password of a patient's account
#[axum::debug_handler]
pub(crate) async fn change_password(
    State(state): State<AppState>,
    id: PathParam<i64>,
    payload: JsonBody<ChangePasswordReq>,
) -> Result<Json<MessageRes>, ApiError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let identity = state.services.identity.clone();
    run_blocking(move || identity.change_password(id, &req.password)).await?;
    Ok(Json(MessageRes::new("Password changed successfully")))
}

#[utoipa::path(
    post,
    path = "/evaluation-results",
    request_body = EvaluationResultReq,
    responses(
        (status = 201, description = "Evaluation stored", body = AppointmentIdRes),
        (status = 400, description = "Missing program name or result", body = ErrorRes),
        (status = 404, description = "Account not found", body = ErrorRes)
    )
)]
/// Store an evaluation result without a date
#[axum::debug_handler]
pub(crate) async fn record_evaluation(
    State(state): State<AppState>,
    payload: JsonBody<EvaluationResultReq>,
) -> Result<(StatusCode, Json<AppointmentIdRes>), ApiError> {
    let Json(req) = payload?;
    let appointments = state.services.appointments.clone();
    let id = run_blocking(move || {
        appointments.record_evaluation(req.user_id, &req.program_name, &req.result_program)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(AppointmentIdRes { id })))
}

#[utoipa::path(
    post,
    path = "/create-appointment-with-result",
    request_body = CreateAppointmentWithResultReq,
    responses(
        (status = 201, description = "Appointment scheduled", body = AppointmentIdRes),
        (status = 400, description = "Missing program name or bad date", body = ErrorRes),
        (status = 404, description = "Account not found", body = ErrorRes)
    )
)]
/// Schedule an appointment that carries an evaluation result
#[axum::debug_handler]
pub(crate) async fn create_appointment_with_result(
    State(state): State<AppState>,
    payload: JsonBody<CreateAppointmentWithResultReq>,
) -> Result<(StatusCode, Json<AppointmentIdRes>), ApiError> {
    let Json(req) = payload?;
    let appointments = state.services.appointments.clone();
    let id = run_blocking(move || {
        appointments.schedule_appointment(
            req.user_id,
            &req.program_name,
            &req.appointment_date,
            req.result_program.as_ref(),
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(AppointmentIdRes { id })))
}

#[utoipa::path(
    post,
    path = "/create-appointment",
    request_body = CreateAppointmentReq,
    responses(
        (status = 201, description = "Appointment scheduled", body = AppointmentIdRes),
        (status = 400, description = "Missing program name or bad date", body = ErrorRes),
        (status = 404, description = "Account not found", body = ErrorRes)
    )
)]
/// Schedule an appointment ahead of any evaluation
#[axum::debug_handler]
pub(crate) async fn create_appointment(
    State(state): State<AppState>,
    payload: JsonBody<CreateAppointmentReq>,
) -> Result<(StatusCode, Json<AppointmentIdRes>), ApiError> {
    let Json(req) = payload?;
    let appointments = state.services.appointments.clone();
    let id = run_blocking(move || {
        appointments.schedule_appointment(
            req.user_id,
            &req.program_name,
            &req.appointment_date,
            None,
        )
    })
    .await?;
    Ok((StatusCode::CREATED, Json(AppointmentIdRes { id })))
}

#[utoipa::path(
    get,
    path = "/appointments-with-date/{user_id}",
    params(("user_id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Zero or one appointment, the one with the latest date", body = [AppointmentRes])
    )
)]
/// The account's latest-dated appointment
///
/// Returned as an array with at most one element.
#[axum::debug_handler]
pub(crate) async fn list_upcoming(
    State(state): State<AppState>,
    user_id: PathParam<i64>,
) -> Result<Json<Vec<AppointmentRes>>, ApiError> {
    let Path(user_id) = user_id?;
    let appointments = state.services.appointments.clone();
    let upcoming = run_blocking(move || appointments.list_upcoming(user_id)).await?;
    Ok(Json(upcoming.into_iter().collect()))
}

#[utoipa::path(
    get,
    path = "/appointments-date-all/{user_id}",
    params(("user_id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Dated appointments, latest first", body = [AppointmentRes])
    )
)]
/// Every dated appointment of one account
#[axum::debug_handler]
pub(crate) async fn list_all(
    State(state): State<AppState>,
    user_id: PathParam<i64>,
) -> Result<Json<Vec<AppointmentRes>>, ApiError> {
    let Path(user_id) = user_id?;
    let appointments = state.services.appointments.clone();
    let all = run_blocking(move || appointments.list_all(user_id)).await?;
    Ok(Json(all))
}

#[utoipa::path(
    get,
    path = "/appointments",
    responses(
        (status = 200, description = "Dated appointments of every patient, earliest first", body = [AppointmentListingRes])
    )
)]
/// Every dated appointment with patient contact details
#[axum::debug_handler]
pub(crate) async fn list_all_with_details(
    State(state): State<AppState>,
) -> Result<Json<Vec<AppointmentListingRes>>, ApiError> {
    let appointments = state.services.appointments.clone();
    let listing = run_blocking(move || appointments.list_all_with_details()).await?;
    Ok(Json(listing))
}

#[utoipa::path(
    get,
    path = "/appointments/{id}",
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment with patient profile", body = AppointmentDetailsRes),
        (status = 404, description = "Appointment or patient not found", body = ErrorRes)
    )
)]
/// One appointment with its patient's full profile
#[axum::debug_handler]
pub(crate) async fn get_appointment(
    State(state): State<AppState>,
    id: PathParam<i64>,
) -> Result<Json<AppointmentDetailsRes>, ApiError> {
    let Path(id) = id?;
    let appointments = state.services.appointments.clone();
    let details = run_blocking(move || appointments.get_details(id)).await?;
    Ok(Json(details))
}

#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    params(("id" = i64, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment deleted (or already absent)", body = MessageRes)
    )
)]
/// Delete an appointment or evaluation
#[axum::debug_handler]
pub(crate) async fn delete_appointment(
    State(state): State<AppState>,
    id: PathParam<i64>,
) -> Result<Json<MessageRes>, ApiError> {
    let Path(id) = id?;
    let appointments = state.services.appointments.clone();
    run_blocking(move || appointments.delete(id)).await?;
    Ok(Json(MessageRes::new("Appointment deleted successfully")))
}

#[utoipa::path(
    get,
    path = "/provinces",
    responses((status = 200, description = "Province names", body = [String]))
)]
/// Province names for the address form
#[axum::debug_handler]
pub(crate) async fn provinces(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.services.divisions.provinces())
}

#[utoipa::path(
    get,
    path = "/provinces/{province}/districts",
    params(("province" = String, Path, description = "Province name")),
    responses((status = 200, description = "District names, sorted; empty for an unknown province", body = [String]))
)]
/// Districts of one province
#[axum::debug_handler]
pub(crate) async fn districts(
    State(state): State<AppState>,
    province: PathParam<String>,
) -> Result<Json<BTreeSet<String>>, ApiError> {
    let Path(province) = province?;
    Ok(Json(state.services.divisions.districts_of(&province)))
}

#[utoipa::path(
    get,
    path = "/districts/{district}/subdistricts",
    params(("district" = String, Path, description = "District name")),
    responses((status = 200, description = "Subdistrict names; empty for an unknown district", body = [String]))
)]
/// Subdistricts of one district
#[axum::debug_handler]
pub(crate) async fn subdistricts(
    State(state): State<AppState>,
    district: PathParam<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let Path(district) = district?;
    Ok(Json(state.services.divisions.subdistricts_of(&district)))
}

/// OpenAPI document for the whole surface
pub(crate) async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
