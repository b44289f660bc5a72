//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Request handling never reads environment variables.
//!
//! Sources, highest precedence first:
//! - environment variables (`OUTREACH_DATABASE_PATH`, `OUTREACH_DIVISIONS_FILE`,
//!   `OUTREACH_REST_ADDR`)
//! - the YAML file named by `OUTREACH_CONFIG`
//! - the defaults in [`crate::constants`]

use crate::constants::{
    DEFAULT_DATABASE_PATH, DEFAULT_HASH_ITERATIONS, DEFAULT_HASH_MEMORY_KIB,
    DEFAULT_HASH_PARALLELISM, DEFAULT_REST_ADDR,
};
use crate::{PatientError, PatientResult};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_ENV: &str = "OUTREACH_CONFIG";
pub const DATABASE_PATH_ENV: &str = "OUTREACH_DATABASE_PATH";
pub const DIVISIONS_FILE_ENV: &str = "OUTREACH_DIVISIONS_FILE";
pub const REST_ADDR_ENV: &str = "OUTREACH_REST_ADDR";

/// Argon2id work factor. Fixed for the life of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_HASH_MEMORY_KIB,
            iterations: DEFAULT_HASH_ITERATIONS,
            parallelism: DEFAULT_HASH_PARALLELISM,
        }
    }
}

impl HashCost {
    /// Checks the bounds Argon2 itself enforces, so a bad value fails at startup rather than on
    /// the first registration.
    pub fn validate(&self) -> PatientResult<()> {
        if self.iterations == 0 || self.parallelism == 0 {
            return Err(PatientError::InvalidInput(
                "hash_cost iterations and parallelism must be at least 1".into(),
            ));
        }
        if self.memory_kib < self.parallelism.saturating_mul(8) {
            return Err(PatientError::InvalidInput(
                "hash_cost memory_kib must be at least 8 x parallelism".into(),
            ));
        }
        Ok(())
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_path: PathBuf,
    divisions_file: Option<PathBuf>,
    hash_cost: HashCost,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` if the database path is empty or the hash cost is
    /// out of range.
    pub fn new(
        database_path: PathBuf,
        divisions_file: Option<PathBuf>,
        hash_cost: HashCost,
    ) -> PatientResult<Self> {
        if database_path.as_os_str().is_empty() {
            return Err(PatientError::InvalidInput(
                "database_path cannot be empty".into(),
            ));
        }
        hash_cost.validate()?;

        Ok(Self {
            database_path,
            divisions_file,
            hash_cost,
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Division dataset override; `None` means the embedded dataset.
    pub fn divisions_file(&self) -> Option<&Path> {
        self.divisions_file.as_deref()
    }

    pub fn hash_cost(&self) -> HashCost {
        self.hash_cost
    }
}

/// Contents of the optional YAML config file. Every key is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database_path: Option<PathBuf>,
    pub divisions_file: Option<PathBuf>,
    pub rest_addr: Option<String>,
    pub hash_cost: Option<HashCost>,
}

impl FileConfig {
    pub fn parse(yaml: &str) -> PatientResult<Self> {
        serde_yaml::from_str(yaml).map_err(PatientError::ConfigParse)
    }

    pub fn load(path: &Path) -> PatientResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(PatientError::ConfigRead)?;
        Self::parse(&raw)
    }
}

/// Everything a binary needs to start.
#[derive(Clone, Debug)]
pub struct Settings {
    pub core: CoreConfig,
    pub rest_addr: SocketAddr,
}

/// Merge the file config with environment values.
///
/// `env` is a lookup function so callers (and tests) decide where values come from; blank
/// values are treated as unset.
///
/// # Errors
///
/// Returns `PatientError::InvalidInput` for an unparseable listen address or an invalid
/// [`CoreConfig`].
pub fn resolve_settings(
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> PatientResult<Settings> {
    let env = |key: &str| {
        env(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let database_path = env(DATABASE_PATH_ENV)
        .map(PathBuf::from)
        .or(file.database_path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));
    let divisions_file = env(DIVISIONS_FILE_ENV)
        .map(PathBuf::from)
        .or(file.divisions_file);
    let rest_addr = env(REST_ADDR_ENV)
        .or(file.rest_addr)
        .unwrap_or_else(|| DEFAULT_REST_ADDR.to_string());
    let rest_addr = rest_addr
        .parse::<SocketAddr>()
        .map_err(|e| PatientError::InvalidInput(format!("rest_addr {rest_addr:?}: {e}")))?;

    let core = CoreConfig::new(
        database_path,
        divisions_file,
        file.hash_cost.unwrap_or_default(),
    )?;

    Ok(Settings { core, rest_addr })
}

/// Resolve settings from the process environment, reading `OUTREACH_CONFIG` if set.
///
/// Intended to be called exactly once from `main`.
pub fn settings_from_env() -> PatientResult<Settings> {
    let file = match std::env::var(CONFIG_FILE_ENV) {
        Ok(path) if !path.trim().is_empty() => FileConfig::load(Path::new(path.trim()))?,
        _ => FileConfig::default(),
    };
    resolve_settings(file, |key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let settings =
            resolve_settings(FileConfig::default(), env_from(&[])).expect("resolve should succeed");

        assert_eq!(settings.core.database_path(), Path::new(DEFAULT_DATABASE_PATH));
        assert_eq!(settings.core.divisions_file(), None);
        assert_eq!(settings.core.hash_cost(), HashCost::default());
        assert_eq!(settings.rest_addr.port(), 3000);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = FileConfig::parse(
            "database_path: /var/lib/outreach/file.db\nrest_addr: 127.0.0.1:8080\n",
        )
        .expect("parse should succeed");

        let settings = resolve_settings(
            file,
            env_from(&[(DATABASE_PATH_ENV, "/tmp/env.db"), (REST_ADDR_ENV, "  ")]),
        )
        .expect("resolve should succeed");

        assert_eq!(settings.core.database_path(), Path::new("/tmp/env.db"));
        assert_eq!(settings.rest_addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn test_partial_hash_cost_keeps_other_defaults() {
        let file = FileConfig::parse("hash_cost:\n  memory_kib: 4096\n").expect("parse should succeed");
        let settings = resolve_settings(file, env_from(&[])).expect("resolve should succeed");

        assert_eq!(settings.core.hash_cost().memory_kib, 4096);
        assert_eq!(settings.core.hash_cost().iterations, DEFAULT_HASH_ITERATIONS);
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            FileConfig::parse("database: x.db\n"),
            Err(PatientError::ConfigParse(_))
        ));

        let err = resolve_settings(FileConfig::default(), env_from(&[(REST_ADDR_ENV, "nowhere")]))
            .expect_err("bad address should fail");
        assert!(matches!(err, PatientError::InvalidInput(_)));

        let err = CoreConfig::new(
            PathBuf::from("x.db"),
            None,
            HashCost {
                memory_kib: 4,
                iterations: 1,
                parallelism: 1,
            },
        )
        .expect_err("tiny memory cost should fail");
        assert!(matches!(err, PatientError::InvalidInput(_)));
    }

    #[test]
    fn test_huge_parallelism_is_rejected_without_overflow() {
        let file = FileConfig::parse("hash_cost:\n  memory_kib: 65536\n  parallelism: 4294967295\n")
            .expect("parse should succeed");
        let err = resolve_settings(file, env_from(&[])).expect_err("huge parallelism should fail");
        assert!(matches!(err, PatientError::InvalidInput(_)));
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("outreach.yaml");
        std::fs::write(&path, "divisions_file: /etc/outreach/divisions.yaml\n")
            .expect("should write config");

        let file = FileConfig::load(&path).expect("load should succeed");
        assert_eq!(
            file.divisions_file,
            Some(PathBuf::from("/etc/outreach/divisions.yaml"))
        );

        let missing = FileConfig::load(&temp_dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(PatientError::ConfigRead(_))));
    }
}
