//! Wiring for the record services.
//!
//! Binaries build one [`RecordServices`] at startup and share it; each service is cheap to
//! clone and holds `Arc`s to the same database and hasher.

use crate::config::CoreConfig;
use crate::db::Database;
use crate::hashing::{Argon2Hasher, CredentialHasher};
use crate::repositories::appointments::AppointmentService;
use crate::repositories::divisions::DivisionDirectory;
use crate::repositories::identity::IdentityService;
use crate::repositories::patients::PatientService;
use crate::PatientResult;
use std::sync::Arc;

/// Every service the API surfaces need, sharing one database.
#[derive(Clone)]
pub struct RecordServices {
    pub db: Arc<Database>,
    pub identity: IdentityService,
    pub patients: PatientService,
    pub appointments: AppointmentService,
    pub divisions: Arc<DivisionDirectory>,
}

impl RecordServices {
    /// Builds the services over an already opened database.
    pub fn new(
        db: Arc<Database>,
        hasher: Arc<dyn CredentialHasher>,
        divisions: Arc<DivisionDirectory>,
    ) -> Self {
        let identity = IdentityService::new(db.clone(), hasher);
        Self {
            patients: PatientService::new(db.clone(), identity.clone()),
            appointments: AppointmentService::new(db.clone()),
            identity,
            divisions,
            db,
        }
    }

    /// Opens the configured database, applies the schema and loads the division dataset.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated, the hash cost is
    /// rejected, or the dataset cannot be loaded.
    pub fn open(cfg: &CoreConfig) -> PatientResult<Self> {
        let db = Database::open(cfg.database_path())?;
        db.migrate()?;
        tracing::info!("opened database at {}", cfg.database_path().display());

        let hasher = Argon2Hasher::new(cfg.hash_cost())?;
        let divisions = DivisionDirectory::load(cfg.divisions_file())?;

        Ok(Self::new(Arc::new(db), Arc::new(hasher), Arc::new(divisions)))
    }
}
