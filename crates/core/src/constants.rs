//! Constants used throughout the outreach core crate.
//!
//! This module contains defaults and tuning values to ensure
//! consistency across the codebase and make maintenance easier.

use std::time::Duration;

/// Default SQLite database file when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "outreach.db";

/// Default REST listen address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// How long a connection waits on a locked database before failing.
pub const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Argon2id memory cost in KiB (the OWASP baseline of 19 MiB).
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19_456;

/// Argon2id iteration count.
pub const DEFAULT_HASH_ITERATIONS: u32 = 2;

/// Argon2id lane count.
pub const DEFAULT_HASH_PARALLELISM: u32 = 1;

/// Thai administrative divisions shipped with the crate.
pub const EMBEDDED_DIVISIONS: &str = include_str!("../data/thai_divisions.yaml");
