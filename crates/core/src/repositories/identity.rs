//! Identity & credential management.
//!
//! An account (`users` row) holds the login credential for one normalised identity number.
//! Accounts and patients are correlated by identity number, not by a foreign key, so every
//! identity-number edit must go through [`IdentityService::sync_identity_number`].
//!
//! Password hashing never runs under the storage lock: callers hash first with
//! [`IdentityService::hash_password`] and hand the resulting [`HashedPassword`] to the
//! transactional steps, and verification reads the digest in a transaction and checks it after
//! the transaction has ended.

use crate::db::{Database, UnitOfWork};
use crate::dto::LoginRes;
use crate::error::{PatientError, PatientResult};
use crate::hashing::CredentialHasher;
use crate::repositories::now_timestamp;
use crate::validation::{validate_id, validate_password};
use crate::NationalId;
use rusqlite::params;
use std::sync::{Arc, OnceLock};

/// Plaintext behind the stand-in digest checked for logins that match no account.
const DECOY_PASSWORD: &str = "outreach-decoy-credential";

/// A digest produced by the configured [`CredentialHasher`].
#[derive(Clone)]
pub struct HashedPassword(String);

impl std::fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}

/// A login account.
#[derive(Clone)]
pub struct Account {
    pub id: i64,
    /// Canonical digits-only identity number.
    pub id_card: String,
    password_hash: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Service for account credentials.
#[derive(Clone)]
pub struct IdentityService {
    db: Arc<Database>,
    hasher: Arc<dyn CredentialHasher>,
    decoy_digest: Arc<OnceLock<Option<String>>>,
}

impl IdentityService {
    pub fn new(db: Arc<Database>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            db,
            hasher,
            decoy_digest: Arc::new(OnceLock::new()),
        }
    }

    /// Validates and hashes a raw password.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` for an empty or oversized password and
    /// `PatientError::PasswordHash` if hashing fails.
    pub fn hash_password(&self, raw_password: &str) -> PatientResult<HashedPassword> {
        validate_password(raw_password)?;
        Ok(HashedPassword(self.hasher.hash(raw_password)?))
    }

    /// Creates the account for `id_card` inside the caller's transaction.
    ///
    /// # Returns
    ///
    /// The new account id.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::DuplicateIdentity` if an account already holds `id_card`.
    pub fn register(
        &self,
        uow: &UnitOfWork<'_>,
        id_card: &NationalId,
        password: &HashedPassword,
    ) -> PatientResult<i64> {
        if find_account(uow, id_card.as_str())?.is_some() {
            return Err(PatientError::DuplicateIdentity);
        }

        let account_id = uow.insert(
            "INSERT INTO users (id_card, password, created_at) VALUES (?1, ?2, ?3)",
            params![id_card.as_str(), password.0, now_timestamp()],
        )?;
        tracing::info!("registered account {}", account_id);
        Ok(account_id)
    }

    /// Checks an identity number and password.
    ///
    /// Unknown identity numbers, malformed identity numbers and wrong passwords all produce the
    /// same `PatientError::AuthFailure`, and all three pay for one password verification.
    pub fn verify(&self, id_card: &str, raw_password: &str) -> PatientResult<Account> {
        let Ok(id_card) = NationalId::parse(id_card) else {
            tracing::warn!("login rejected: malformed identity number");
            self.verify_decoy(raw_password);
            return Err(PatientError::AuthFailure);
        };

        let account = self
            .db
            .with_transaction(|uow| find_account(uow, id_card.as_str()))?;

        let Some(account) = account else {
            tracing::warn!("login rejected: unknown identity number");
            self.verify_decoy(raw_password);
            return Err(PatientError::AuthFailure);
        };

        match self.hasher.verify(raw_password, &account.password_hash) {
            Ok(true) => Ok(account),
            Ok(false) => {
                tracing::warn!("login rejected for account {}: wrong password", account.id);
                Err(PatientError::AuthFailure)
            }
            Err(e) => {
                // Unreadable digest; still answer like any other rejection.
                tracing::error!("account {} has an unreadable password digest: {}", account.id, e);
                Err(PatientError::AuthFailure)
            }
        }
    }

    /// Checks `raw_password` against a digest no account owns, so a rejected login costs the
    /// same whether or not the identity number exists. The digest is made on first use with the
    /// configured work factor.
    fn verify_decoy(&self, raw_password: &str) {
        let digest = self.decoy_digest.get_or_init(|| {
            self.hasher
                .hash(DECOY_PASSWORD)
                .inspect_err(|e| tracing::error!("failed to prepare decoy digest: {}", e))
                .ok()
        });
        if let Some(digest) = digest {
            let _ = self.hasher.verify(raw_password, digest);
        }
    }

    /// Verifies the credentials and returns who logged in.
    ///
    /// An account whose patient record cannot be found is rejected like a bad password.
    pub fn login(&self, id_card: &str, raw_password: &str) -> PatientResult<LoginRes> {
        let account = self.verify(id_card, raw_password)?;

        let summary = self.db.with_transaction(|uow| {
            uow.query_optional(
                "SELECT id, title_name, first_name, last_name FROM patient WHERE id_card = ?1",
                params![account.id_card],
                |row| {
                    Ok(LoginRes {
                        id: row.get::<_, i64>(0)?.to_string(),
                        account_id: account.id,
                        title_name: row.get(1)?,
                        first_name: row.get(2)?,
                        last_name: row.get(3)?,
                    })
                },
            )
        })?;

        summary.ok_or_else(|| {
            tracing::warn!("login rejected for account {}: no patient record", account.id);
            PatientError::AuthFailure
        })
    }

    /// Replaces the password of the account that belongs to `patient_id`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` if the patient or its account does not exist.
    pub fn change_password(&self, patient_id: i64, new_raw_password: &str) -> PatientResult<()> {
        validate_id("patient id", patient_id)?;
        let password = self.hash_password(new_raw_password)?;
        self.db
            .with_transaction(|uow| self.rotate_password(uow, patient_id, &password))
    }

    /// Password rotation inside an existing transaction.
    ///
    /// Resolves the account through the patient's current identity number, stores the new
    /// digest and appends a `password_changes` row.
    pub fn rotate_password(
        &self,
        uow: &UnitOfWork<'_>,
        patient_id: i64,
        password: &HashedPassword,
    ) -> PatientResult<()> {
        let id_card: String = uow.query_one(
            "SELECT id_card FROM patient WHERE id = ?1",
            params![patient_id],
            &format!("patient {patient_id}"),
            |row| row.get(0),
        )?;
        let account = find_account(uow, &id_card)?
            .ok_or_else(|| PatientError::not_found(format!("account for patient {patient_id}")))?;

        uow.execute(
            "UPDATE users SET password = ?1 WHERE id = ?2",
            params![password.0, account.id],
        )?;
        uow.insert(
            "INSERT INTO password_changes (user_id, patient_id, changed_at) VALUES (?1, ?2, ?3)",
            params![account.id, patient_id, now_timestamp()],
        )?;

        tracing::info!(
            "password changed for account {} by patient {}",
            account.id,
            patient_id
        );
        Ok(())
    }

    /// Moves the account keyed by `old_id_card` to `new_id_card`.
    ///
    /// No-op when the two are equal.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::DuplicateIdentity` if another account already holds
    /// `new_id_card`, and `PatientError::NotFound` if no account holds `old_id_card`.
    pub fn sync_identity_number(
        &self,
        uow: &UnitOfWork<'_>,
        old_id_card: &str,
        new_id_card: &NationalId,
    ) -> PatientResult<()> {
        if old_id_card == new_id_card.as_str() {
            return Ok(());
        }
        if find_account(uow, new_id_card.as_str())?.is_some() {
            return Err(PatientError::DuplicateIdentity);
        }

        let updated = uow.execute(
            "UPDATE users SET id_card = ?1 WHERE id_card = ?2",
            params![new_id_card.as_str(), old_id_card],
        )?;
        if updated == 0 {
            return Err(PatientError::not_found("account for current identity number"));
        }

        tracing::info!("account identity number resynced");
        Ok(())
    }
}

fn find_account(uow: &UnitOfWork<'_>, id_card: &str) -> PatientResult<Option<Account>> {
    uow.query_optional(
        "SELECT id, id_card, password FROM users WHERE id_card = ?1",
        params![id_card],
        |row| {
            Ok(Account {
                id: row.get(0)?,
                id_card: row.get(1)?,
                password_hash: row.get(2)?,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::tests::fast_hasher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls through to a real hasher.
    struct CountingHasher {
        inner: crate::hashing::Argon2Hasher,
        hashes: AtomicUsize,
        verifies: AtomicUsize,
    }

    impl CredentialHasher for CountingHasher {
        fn hash(&self, plaintext: &str) -> PatientResult<String> {
            self.hashes.fetch_add(1, Ordering::SeqCst);
            self.inner.hash(plaintext)
        }

        fn verify(&self, plaintext: &str, digest: &str) -> PatientResult<bool> {
            self.verifies.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(plaintext, digest)
        }
    }

    fn service() -> IdentityService {
        let db = Arc::new(Database::open_in_memory().expect("open should succeed"));
        IdentityService::new(db, Arc::new(fast_hasher()))
    }

    fn id(raw: &str) -> NationalId {
        NationalId::parse(raw).expect("valid identity number")
    }

    fn register(service: &IdentityService, raw_id: &str, password: &str) -> PatientResult<i64> {
        let hashed = service.hash_password(password)?;
        service
            .db
            .with_transaction(|uow| service.register(uow, &id(raw_id), &hashed))
    }

    fn account_count(service: &IdentityService) -> i64 {
        service
            .db
            .with_transaction(|uow| {
                uow.query_one("SELECT COUNT(*) FROM users", [], "count", |row| row.get(0))
            })
            .expect("count should succeed")
    }

    #[test]
    fn test_register_then_verify() {
        let service = service();
        let account_id = register(&service, "1234567890123", "s3cret").expect("register should succeed");

        let account = service
            .verify("1-2345-67890-12-3", "s3cret")
            .expect("verify should succeed");
        assert_eq!(account.id, account_id);
        assert_eq!(account.id_card, "1234567890123");
    }

    #[test]
    fn test_register_duplicate_identity() {
        let service = service();
        register(&service, "1234567890123", "first").expect("register should succeed");

        let err = register(&service, "1-2345-67890-12-3", "second")
            .expect_err("duplicate should fail");
        assert!(matches!(err, PatientError::DuplicateIdentity));
        assert_eq!(account_count(&service), 1);

        service
            .verify("1234567890123", "first")
            .expect("original credential should still verify");
    }

    #[test]
    fn test_wrong_password_and_unknown_identity_are_indistinguishable() {
        let service = service();
        register(&service, "1234567890123", "right").expect("register should succeed");

        let wrong = service
            .verify("1234567890123", "wrong")
            .expect_err("wrong password should fail");
        let unknown = service
            .verify("9999999999999", "right")
            .expect_err("unknown identity should fail");
        let malformed = service
            .verify("12-34", "right")
            .expect_err("malformed identity should fail");

        assert!(matches!(wrong, PatientError::AuthFailure));
        assert!(matches!(unknown, PatientError::AuthFailure));
        assert!(matches!(malformed, PatientError::AuthFailure));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn test_rejected_logins_all_verify_a_password() {
        let hasher = Arc::new(CountingHasher {
            inner: fast_hasher(),
            hashes: AtomicUsize::new(0),
            verifies: AtomicUsize::new(0),
        });
        let db = Arc::new(Database::open_in_memory().expect("open should succeed"));
        let service = IdentityService::new(db, hasher.clone());
        register(&service, "1234567890123", "right").expect("register should succeed");
        assert_eq!(hasher.hashes.load(Ordering::SeqCst), 1);

        for (id_card, password) in [
            ("1234567890123", "wrong"),
            ("9999999999999", "right"),
            ("12-34", "right"),
            ("8888888888888", "right"),
        ] {
            let before = hasher.verifies.load(Ordering::SeqCst);
            let err = service
                .verify(id_card, password)
                .expect_err("login should be rejected");
            assert!(matches!(err, PatientError::AuthFailure));
            assert_eq!(hasher.verifies.load(Ordering::SeqCst), before + 1);
        }

        // The decoy digest is made once and reused.
        assert_eq!(hasher.hashes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_hash_password_rejects_empty() {
        let err = service()
            .hash_password("")
            .expect_err("empty password should fail");
        assert!(matches!(err, PatientError::InvalidInput(_)));
    }

    #[test]
    fn test_sync_identity_number_moves_account() {
        let service = service();
        register(&service, "1111111111111", "pw").expect("register should succeed");

        service
            .db
            .with_transaction(|uow| {
                service.sync_identity_number(uow, "1111111111111", &id("2222222222222"))
            })
            .expect("sync should succeed");

        assert_eq!(account_count(&service), 1);
        service
            .verify("2222222222222", "pw")
            .expect("new identity number should verify");
        assert!(matches!(
            service.verify("1111111111111", "pw"),
            Err(PatientError::AuthFailure)
        ));
    }

    #[test]
    fn test_sync_identity_number_no_op_and_conflicts() {
        let service = service();
        register(&service, "1111111111111", "pw").expect("register should succeed");
        register(&service, "2222222222222", "pw").expect("register should succeed");

        service
            .db
            .with_transaction(|uow| {
                service.sync_identity_number(uow, "1111111111111", &id("1111111111111"))
            })
            .expect("same number should be a no-op");

        let err = service
            .db
            .with_transaction(|uow| {
                service.sync_identity_number(uow, "1111111111111", &id("2222222222222"))
            })
            .expect_err("taken number should fail");
        assert!(matches!(err, PatientError::DuplicateIdentity));

        let err = service
            .db
            .with_transaction(|uow| {
                service.sync_identity_number(uow, "3333333333333", &id("4444444444444"))
            })
            .expect_err("missing account should fail");
        assert!(matches!(err, PatientError::NotFound(_)));
    }

    #[test]
    fn test_change_password_for_unknown_patient() {
        let err = service()
            .change_password(42, "new")
            .expect_err("unknown patient should fail");
        assert!(matches!(err, PatientError::NotFound(_)));
    }

    #[test]
    fn test_hashed_password_debug_hides_digest() {
        let hashed = service().hash_password("pw").expect("hash should succeed");
        assert_eq!(format!("{hashed:?}"), "HashedPassword(..)");
    }
}
