//! # API REST
//!
//! REST API implementation for the outreach service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI documentation (served as JSON at `/api-docs/openapi.json`)
//! - REST-specific concerns (JSON bodies, status codes, CORS)
//!
//! Uses `api-shared` for request/response types and `outreach-core` for everything else.

#![warn(rust_2018_idioms)]

mod error;
mod handlers;

pub use error::ApiError;

use api_shared::{
    AppointmentDetailsRes, AppointmentIdRes, AppointmentListingRes, AppointmentRes,
    ChangePasswordReq, CreateAppointmentReq, CreateAppointmentWithResultReq, CreatePatientReq,
    CreatePatientRes, ErrorRes, EvaluationResultReq, HealthRes, LoginReq, LoginRes, MessageRes,
    PatientFields, ProfileRes, UpdateHealthReq, UpdateProfileReq,
};
use axum::routing::{get, post, put};
use axum::Router;
use outreach_core::RecordServices;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

/// Application state for the REST API server
///
/// Holds the record services; every handler clones the one it needs.
#[derive(Clone)]
pub struct AppState {
    services: RecordServices,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::create_patient,
        handlers::login,
        handlers::get_profile,
        handlers::update_profile,
        handlers::update_health,
        handlers::change_password,
        handlers::record_evaluation,
        handlers::create_appointment_with_result,
        handlers::create_appointment,
        handlers::list_upcoming,
        handlers::list_all,
        handlers::list_all_with_details,
        handlers::get_appointment,
        handlers::delete_appointment,
        handlers::provinces,
        handlers::districts,
        handlers::subdistricts,
    ),
    components(schemas(
        HealthRes,
        MessageRes,
        ErrorRes,
        PatientFields,
        CreatePatientReq,
        CreatePatientRes,
        LoginReq,
        LoginRes,
        ProfileRes,
        UpdateProfileReq,
        UpdateHealthReq,
        ChangePasswordReq,
        EvaluationResultReq,
        CreateAppointmentWithResultReq,
        CreateAppointmentReq,
        AppointmentIdRes,
        AppointmentRes,
        AppointmentListingRes,
        AppointmentDetailsRes,
    ))
)]
pub struct ApiDoc;

/// Builds the full REST router over `services`, with permissive CORS.
pub fn router(services: RecordServices) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/create-patient", post(handlers::create_patient))
        .route("/login", post(handlers::login))
        .route(
            "/profile/:id",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/profile/:id/health", put(handlers::update_health))
        .route("/profile/:id/password", put(handlers::change_password))
        .route("/evaluation-results", post(handlers::record_evaluation))
        .route(
            "/create-appointment-with-result",
            post(handlers::create_appointment_with_result),
        )
        .route("/create-appointment", post(handlers::create_appointment))
        .route(
            "/appointments-with-date/:user_id",
            get(handlers::list_upcoming),
        )
        .route("/appointments-date-all/:user_id", get(handlers::list_all))
        .route("/appointments", get(handlers::list_all_with_details))
        .route(
            "/appointments/:id",
            get(handlers::get_appointment).delete(handlers::delete_appointment),
        )
        .route("/provinces", get(handlers::provinces))
        .route("/provinces/:province/districts", get(handlers::districts))
        .route(
            "/districts/:district/subdistricts",
            get(handlers::subdistricts),
        )
        .route("/api-docs/openapi.json", get(handlers::openapi))
        .layer(CorsLayer::permissive())
        .with_state(AppState { services })
}
