//! Record management modules.
//!
//! One service per component of the record engine, all sharing a single [`crate::Database`]:
//! credentials (`identity`), patient profiles and health metrics (`patients`), appointments and
//! evaluations (`appointments`), plus the read-only address dataset (`divisions`).

pub mod appointments;
pub mod divisions;
pub mod identity;
pub mod patients;

use chrono::{SecondsFormat, Utc};

/// Current UTC time in the fixed-width form stored in `*_at` / `record_date` columns, so that
/// text ordering matches time ordering.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
