//! # Outreach Core
//!
//! Core business logic for the outreach patient registration and appointment service.
//!
//! This crate contains the record engine and its storage:
//! - Login accounts with Argon2id password digests (`repositories::identity`)
//! - Patient profiles with derived BMI and waist-to-height ratio (`repositories::patients`)
//! - Evaluations and appointments (`repositories::appointments`)
//! - The read-only province/district/subdistrict dataset (`repositories::divisions`)
//!
//! Every operation runs in one SQLite transaction through [`Database::with_transaction`].
//!
//! **No API concerns**: HTTP routing, status codes and CLI parsing belong in `api-rest` and
//! `cli`.

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod hashing;
pub mod metrics;
pub mod repositories;
pub mod services;
pub mod validation;

// Request/response bodies shared with the API crates.
pub use api_shared::dto;

pub use config::{resolve_settings, settings_from_env, CoreConfig, FileConfig, HashCost, Settings};
pub use db::{Database, UnitOfWork};
pub use error::{ErrorKind, PatientError, PatientResult};
pub use hashing::{Argon2Hasher, CredentialHasher};
pub use outreach_types::{
    format_national_id, format_phone_number, NationalId, NonEmptyText, PhoneNumber, TextError,
};
pub use repositories::appointments::AppointmentService;
pub use repositories::divisions::DivisionDirectory;
pub use repositories::identity::IdentityService;
pub use repositories::patients::PatientService;
pub use services::RecordServices;
