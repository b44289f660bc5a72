//! # API Shared
//!
//! Shared definitions for the outreach APIs.
//!
//! Contains:
//! - Request/response types (`dto` module), serialised as JSON and described for OpenAPI
//! - Shared services like `HealthService`
//!
//! Used by `outreach-core` (read models are returned directly as these types) and `api-rest`.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
