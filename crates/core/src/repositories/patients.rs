//! Patient profiles and health metrics.
//!
//! A patient is stored as one `patient` row plus `health_data` rows holding the derived BMI and
//! waist-to-height ratio. Identity numbers and phone numbers are stored digits-only and only
//! punctuated when a profile is read back.

use crate::db::{Database, UnitOfWork};
use crate::dto::{CreatePatientReq, PatientFields, ProfileRes, UpdateHealthReq, UpdateProfileReq};
use crate::error::{PatientError, PatientResult};
use crate::metrics::{HealthMetrics, Measurements};
use crate::repositories::identity::IdentityService;
use crate::repositories::now_timestamp;
use crate::validation::{parse_calendar_date, storage_date, validate_id};
use crate::{format_national_id, format_phone_number, NationalId, NonEmptyText, PhoneNumber};
use chrono::NaiveDate;
use rusqlite::params;
use std::sync::Arc;

const PROFILE_QUERY: &str = r"
SELECT p.id, p.title_name, p.first_name, p.last_name, p.id_card, p.phone, p.gender,
       p.date_birth, p.house_number, p.street, p.village, p.subdistrict, p.district,
       p.province, p.weight, p.height, p.waist,
       u.id, h.bmi, h.waist_to_height_ratio, h.record_date
FROM patient p
LEFT JOIN users u ON u.id_card = p.id_card
LEFT JOIN health_data h ON h.id = (
    SELECT id FROM health_data
    WHERE patient_id = p.id
    ORDER BY record_date DESC, id DESC
    LIMIT 1
)
WHERE p.id = ?1
";

/// Validated, normalised profile fields ready to be written.
#[derive(Debug)]
struct PatientDraft {
    title_name: NonEmptyText,
    first_name: NonEmptyText,
    last_name: NonEmptyText,
    id_card: NationalId,
    phone: PhoneNumber,
    gender: NonEmptyText,
    date_birth: NaiveDate,
    house_number: String,
    street: String,
    village: String,
    subdistrict: String,
    district: String,
    province: String,
    measurements: Measurements,
}

impl PatientDraft {
    fn from_fields(fields: &PatientFields) -> PatientResult<Self> {
        Ok(Self {
            title_name: required("title_name", &fields.title_name)?,
            first_name: required("first_name", &fields.first_name)?,
            last_name: required("last_name", &fields.last_name)?,
            id_card: NationalId::parse(&fields.id_card)
                .map_err(|e| PatientError::InvalidInput(format!("id_card: {e}")))?,
            phone: PhoneNumber::parse(&fields.phone)
                .map_err(|e| PatientError::InvalidInput(format!("phone: {e}")))?,
            gender: required("gender", &fields.gender)?,
            date_birth: parse_calendar_date("date_birth", &fields.date_birth)?,
            house_number: fields.house_number.trim().to_string(),
            street: fields.street.trim().to_string(),
            village: fields.village.trim().to_string(),
            subdistrict: fields.subdistrict.trim().to_string(),
            district: fields.district.trim().to_string(),
            province: fields.province.trim().to_string(),
            measurements: Measurements::new(fields.weight, fields.height, fields.waist)?,
        })
    }
}

fn required(field: &str, value: &str) -> PatientResult<NonEmptyText> {
    NonEmptyText::new(value).map_err(|e| PatientError::InvalidInput(format!("{field}: {e}")))
}

/// Service for patient records.
#[derive(Clone)]
pub struct PatientService {
    db: Arc<Database>,
    identity: IdentityService,
}

impl PatientService {
    pub fn new(db: Arc<Database>, identity: IdentityService) -> Self {
        Self { db, identity }
    }

    /// Creates a patient together with its login account and first health-metrics row.
    ///
    /// All three writes happen in one transaction; if any of them fails nothing is stored.
    ///
    /// # Arguments
    ///
    /// * `req` - Profile fields, measurements and the initial password.
    ///
    /// # Returns
    ///
    /// The new patient id.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` for missing or malformed fields, and
    /// `PatientError::DuplicateIdentity` if an account already exists for the identity number.
    pub fn create_patient(&self, req: &CreatePatientReq) -> PatientResult<i64> {
        let draft = PatientDraft::from_fields(&req.profile)?;
        let password = self.identity.hash_password(&req.password)?;
        let metrics = draft.measurements.metrics();

        self.db.with_transaction(|uow| {
            let account_id = self.identity.register(uow, &draft.id_card, &password)?;
            let patient_id = uow.insert(
                "INSERT INTO patient (title_name, first_name, last_name, id_card, phone, gender, \
                 date_birth, house_number, street, village, subdistrict, district, province, \
                 weight, height, waist) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    draft.title_name.as_str(),
                    draft.first_name.as_str(),
                    draft.last_name.as_str(),
                    draft.id_card.as_str(),
                    draft.phone.as_str(),
                    draft.gender.as_str(),
                    storage_date(draft.date_birth),
                    draft.house_number,
                    draft.street,
                    draft.village,
                    draft.subdistrict,
                    draft.district,
                    draft.province,
                    draft.measurements.weight_kg(),
                    draft.measurements.height_cm(),
                    draft.measurements.waist_cm(),
                ],
            )?;
            uow.insert(
                "INSERT INTO health_data (patient_id, bmi, waist_to_height_ratio, record_date) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    patient_id,
                    metrics.bmi,
                    metrics.waist_to_height_ratio,
                    now_timestamp()
                ],
            )?;

            tracing::info!("created patient {} with account {}", patient_id, account_id);
            Ok(patient_id)
        })
    }

    /// Returns the profile of `patient_id` joined with its most recent health metrics.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` if the patient does not exist.
    pub fn get_profile(&self, patient_id: i64) -> PatientResult<ProfileRes> {
        self.db
            .with_transaction(|uow| load_profile(uow, patient_id))
    }

    /// Replaces the profile of `patient_id`.
    ///
    /// A changed identity number is carried over to the login account, the health metrics are
    /// recomputed from the submitted measurements, and a non-empty `password` rotates the
    /// account password. Everything commits together or not at all.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` if the patient does not exist, and
    /// `PatientError::DuplicateIdentity` if the new identity number belongs to another account.
    pub fn update_profile(&self, patient_id: i64, req: &UpdateProfileReq) -> PatientResult<()> {
        validate_id("patient id", patient_id)?;
        let draft = PatientDraft::from_fields(&req.profile)?;
        let password = match req.password.as_deref() {
            Some(raw) if !raw.is_empty() => Some(self.identity.hash_password(raw)?),
            _ => None,
        };
        let metrics = draft.measurements.metrics();

        self.db.with_transaction(|uow| {
            let current_id_card: String = uow.query_one(
                "SELECT id_card FROM patient WHERE id = ?1",
                params![patient_id],
                &format!("patient {patient_id}"),
                |row| row.get(0),
            )?;
            self.identity
                .sync_identity_number(uow, &current_id_card, &draft.id_card)?;

            uow.execute(
                "UPDATE patient SET title_name = ?1, first_name = ?2, last_name = ?3, \
                 id_card = ?4, phone = ?5, gender = ?6, date_birth = ?7, house_number = ?8, \
                 street = ?9, village = ?10, subdistrict = ?11, district = ?12, province = ?13, \
                 weight = ?14, height = ?15, waist = ?16 \
                 WHERE id = ?17",
                params![
                    draft.title_name.as_str(),
                    draft.first_name.as_str(),
                    draft.last_name.as_str(),
                    draft.id_card.as_str(),
                    draft.phone.as_str(),
                    draft.gender.as_str(),
                    storage_date(draft.date_birth),
                    draft.house_number,
                    draft.street,
                    draft.village,
                    draft.subdistrict,
                    draft.district,
                    draft.province,
                    draft.measurements.weight_kg(),
                    draft.measurements.height_cm(),
                    draft.measurements.waist_cm(),
                    patient_id,
                ],
            )?;

            if let Some(password) = &password {
                self.identity.rotate_password(uow, patient_id, password)?;
            }
            upsert_health_data(uow, patient_id, &metrics)?;

            tracing::info!("updated profile of patient {}", patient_id);
            Ok(())
        })
    }

    /// Replaces the measurements of `patient_id` and recomputes its health metrics.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` for non-positive measurements and
    /// `PatientError::NotFound` if the patient does not exist.
    pub fn update_health(&self, patient_id: i64, req: &UpdateHealthReq) -> PatientResult<()> {
        validate_id("patient id", patient_id)?;
        let measurements = Measurements::new(req.weight, req.height, req.waist)?;
        let metrics = measurements.metrics();

        self.db.with_transaction(|uow| {
            let updated = uow.execute(
                "UPDATE patient SET weight = ?1, height = ?2, waist = ?3 WHERE id = ?4",
                params![
                    measurements.weight_kg(),
                    measurements.height_cm(),
                    measurements.waist_cm(),
                    patient_id
                ],
            )?;
            if updated == 0 {
                return Err(PatientError::not_found(format!("patient {patient_id}")));
            }
            upsert_health_data(uow, patient_id, &metrics)?;

            tracing::info!(
                "updated health metrics of patient {}: bmi {}, ratio {}",
                patient_id,
                metrics.bmi,
                metrics.waist_to_height_ratio
            );
            Ok(())
        })
    }
}

/// Reads one profile inside an existing transaction.
pub(crate) fn load_profile(uow: &UnitOfWork<'_>, patient_id: i64) -> PatientResult<ProfileRes> {
    uow.query_one(
        PROFILE_QUERY,
        params![patient_id],
        &format!("patient {patient_id}"),
        |row| {
            Ok(ProfileRes {
                id: row.get(0)?,
                title_name: row.get(1)?,
                first_name: row.get(2)?,
                last_name: row.get(3)?,
                id_card: format_national_id(&row.get::<_, String>(4)?),
                phone: format_phone_number(&row.get::<_, String>(5)?),
                gender: row.get(6)?,
                date_birth: row.get(7)?,
                house_number: row.get(8)?,
                street: row.get(9)?,
                village: row.get(10)?,
                subdistrict: row.get(11)?,
                district: row.get(12)?,
                province: row.get(13)?,
                weight: row.get(14)?,
                height: row.get(15)?,
                waist: row.get(16)?,
                account_id: row.get(17)?,
                bmi: row.get(18)?,
                waist_to_height_ratio: row.get(19)?,
                record_date: row.get(20)?,
            })
        },
    )
}

/// Updates the patient's health-metrics row, inserting one if none exists yet.
fn upsert_health_data(
    uow: &UnitOfWork<'_>,
    patient_id: i64,
    metrics: &HealthMetrics,
) -> PatientResult<()> {
    let recorded_at = now_timestamp();
    let updated = uow.execute(
        "UPDATE health_data SET bmi = ?1, waist_to_height_ratio = ?2, record_date = ?3 \
         WHERE patient_id = ?4",
        params![
            metrics.bmi,
            metrics.waist_to_height_ratio,
            recorded_at,
            patient_id
        ],
    )?;
    if updated == 0 {
        uow.insert(
            "INSERT INTO health_data (patient_id, bmi, waist_to_height_ratio, record_date) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                patient_id,
                metrics.bmi,
                metrics.waist_to_height_ratio,
                recorded_at
            ],
        )?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::hashing::tests::fast_hasher;

    pub(crate) fn fields(id_card: &str) -> PatientFields {
        PatientFields {
            title_name: "นาย".into(),
            first_name: "สมชาย".into(),
            last_name: "ใจดี".into(),
            id_card: id_card.into(),
            phone: "081-234-5678".into(),
            gender: "ชาย".into(),
            date_birth: "15/01/1990".into(),
            house_number: "12/3".into(),
            street: "".into(),
            village: "".into(),
            subdistrict: "ศรีภูมิ".into(),
            district: "เมืองเชียงใหม่".into(),
            province: "เชียงใหม่".into(),
            weight: 70.0,
            height: 175.0,
            waist: 80.0,
        }
    }

    pub(crate) fn services() -> (Arc<Database>, IdentityService, PatientService) {
        let db = Arc::new(Database::open_in_memory().expect("open should succeed"));
        let identity = IdentityService::new(db.clone(), Arc::new(fast_hasher()));
        let patients = PatientService::new(db.clone(), identity.clone());
        (db, identity, patients)
    }

    pub(crate) fn create(patients: &PatientService, id_card: &str, password: &str) -> i64 {
        patients
            .create_patient(&CreatePatientReq {
                profile: fields(id_card),
                password: password.into(),
            })
            .expect("create_patient should succeed")
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.with_transaction(|uow| {
            uow.query_one(&format!("SELECT COUNT(*) FROM {table}"), [], "count", |row| {
                row.get(0)
            })
        })
        .expect("count should succeed")
    }

    #[test]
    fn test_create_then_get_profile() {
        let (_, identity, patients) = services();
        let patient_id = create(&patients, "1234567890123", "secret");

        let profile = patients
            .get_profile(patient_id)
            .expect("get_profile should succeed");
        assert_eq!(profile.id, patient_id);
        assert_eq!(profile.first_name, "สมชาย");
        assert_eq!(profile.id_card, "1-2345-67890-12-3");
        assert_eq!(profile.phone, "081-234-5678");
        assert_eq!(profile.date_birth, "1990-01-15");
        assert_eq!(profile.bmi, Some(22.86));
        assert_eq!(profile.waist_to_height_ratio, Some(0.46));
        assert!(profile.record_date.is_some());

        let login = identity
            .login("1234567890123", "secret")
            .expect("login should succeed");
        assert_eq!(login.id, patient_id.to_string());
        assert_eq!(profile.account_id, Some(login.account_id));
    }

    #[test]
    fn test_create_duplicate_leaves_no_partial_rows() {
        let (db, _, patients) = services();
        create(&patients, "1234567890123", "secret");

        let err = patients
            .create_patient(&CreatePatientReq {
                profile: fields("1-2345-67890-12-3"),
                password: "other".into(),
            })
            .expect_err("duplicate should fail");
        assert!(matches!(err, PatientError::DuplicateIdentity));

        assert_eq!(count(&db, "users"), 1);
        assert_eq!(count(&db, "patient"), 1);
        assert_eq!(count(&db, "health_data"), 1);
    }

    #[test]
    fn test_create_rejects_invalid_fields() {
        let (db, _, patients) = services();

        let mut bad_id = fields("12345");
        bad_id.first_name = "x".into();
        let mut blank_name = fields("1234567890123");
        blank_name.first_name = "  ".into();
        let mut zero_height = fields("1234567890123");
        zero_height.height = 0.0;
        let mut bad_date = fields("1234567890123");
        bad_date.date_birth = "31/02/1990".into();

        for profile in [bad_id, blank_name, zero_height, bad_date] {
            let err = patients
                .create_patient(&CreatePatientReq {
                    profile,
                    password: "secret".into(),
                })
                .expect_err("invalid input should fail");
            assert!(matches!(err, PatientError::InvalidInput(_)), "{err}");
        }
        assert_eq!(count(&db, "users"), 0);
    }

    #[test]
    fn test_get_profile_not_found() {
        let (_, _, patients) = services();
        let err = patients.get_profile(999).expect_err("missing patient should fail");
        assert!(matches!(err, PatientError::NotFound(_)));
    }

    #[test]
    fn test_get_profile_non_positive_id_is_not_found() {
        let (_, _, patients) = services();
        for id in [0, -5] {
            let err = patients.get_profile(id).expect_err("missing patient should fail");
            assert!(matches!(err, PatientError::NotFound(_)));
        }
    }

    #[test]
    fn test_update_health_recomputes_metrics_in_place() {
        let (db, _, patients) = services();
        let patient_id = create(&patients, "1234567890123", "secret");

        patients
            .update_health(
                patient_id,
                &UpdateHealthReq {
                    weight: 100.0,
                    height: 200.0,
                    waist: 90.0,
                },
            )
            .expect("update_health should succeed");

        let profile = patients
            .get_profile(patient_id)
            .expect("get_profile should succeed");
        assert_eq!(profile.weight, 100.0);
        assert_eq!(profile.bmi, Some(25.0));
        assert_eq!(profile.waist_to_height_ratio, Some(0.45));
        assert_eq!(count(&db, "health_data"), 1);
    }

    #[test]
    fn test_update_health_inserts_missing_metrics_row() {
        let (db, _, patients) = services();
        let patient_id = create(&patients, "1234567890123", "secret");
        db.with_transaction(|uow| uow.execute("DELETE FROM health_data", []))
            .expect("delete should succeed");

        patients
            .update_health(
                patient_id,
                &UpdateHealthReq {
                    weight: 50.0,
                    height: 160.0,
                    waist: 70.0,
                },
            )
            .expect("update_health should succeed");

        let profile = patients
            .get_profile(patient_id)
            .expect("get_profile should succeed");
        assert_eq!(profile.bmi, Some(19.53));
        assert_eq!(count(&db, "health_data"), 1);
    }

    #[test]
    fn test_update_health_unknown_patient() {
        let (_, _, patients) = services();
        let err = patients
            .update_health(
                7,
                &UpdateHealthReq {
                    weight: 50.0,
                    height: 160.0,
                    waist: 70.0,
                },
            )
            .expect_err("missing patient should fail");
        assert!(matches!(err, PatientError::NotFound(_)));
    }

    #[test]
    fn test_update_profile_moves_identity_and_password() {
        let (db, identity, patients) = services();
        let patient_id = create(&patients, "1111111111111", "old");

        let mut profile = fields("2222222222222");
        profile.first_name = "สมหญิง".into();
        profile.weight = 80.0;
        patients
            .update_profile(
                patient_id,
                &UpdateProfileReq {
                    profile,
                    password: Some("new".into()),
                },
            )
            .expect("update_profile should succeed");

        let updated = patients
            .get_profile(patient_id)
            .expect("get_profile should succeed");
        assert_eq!(updated.first_name, "สมหญิง");
        assert_eq!(updated.id_card, "2-2222-22222-22-2");
        assert_eq!(updated.bmi, Some(26.12));

        identity
            .login("2222222222222", "new")
            .expect("new credentials should log in");
        assert!(matches!(
            identity.login("1111111111111", "old"),
            Err(PatientError::AuthFailure)
        ));
        assert_eq!(count(&db, "password_changes"), 1);
    }

    #[test]
    fn test_update_profile_identity_conflict_rolls_back() {
        let (_, identity, patients) = services();
        let first = create(&patients, "1111111111111", "one");
        create(&patients, "2222222222222", "two");

        let mut profile = fields("2222222222222");
        profile.first_name = "changed".into();
        let err = patients
            .update_profile(
                first,
                &UpdateProfileReq {
                    profile,
                    password: None,
                },
            )
            .expect_err("taken identity should fail");
        assert!(matches!(err, PatientError::DuplicateIdentity));

        let unchanged = patients.get_profile(first).expect("get_profile should succeed");
        assert_eq!(unchanged.first_name, "สมชาย");
        assert_eq!(unchanged.id_card, "1-1111-11111-11-1");
        identity
            .login("1111111111111", "one")
            .expect("original credentials should still log in");
    }

    #[test]
    fn test_update_profile_without_password_keeps_credentials() {
        let (db, identity, patients) = services();
        let patient_id = create(&patients, "1234567890123", "keep");

        patients
            .update_profile(
                patient_id,
                &UpdateProfileReq {
                    profile: fields("1234567890123"),
                    password: Some(String::new()),
                },
            )
            .expect("update_profile should succeed");

        identity
            .login("1234567890123", "keep")
            .expect("password should be unchanged");
        assert_eq!(count(&db, "password_changes"), 0);
    }

    #[test]
    fn test_change_password_records_audit_row() {
        let (db, identity, patients) = services();
        let patient_id = create(&patients, "1234567890123", "before");

        identity
            .change_password(patient_id, "after")
            .expect("change_password should succeed");

        identity
            .login("1234567890123", "after")
            .expect("new password should log in");
        assert!(matches!(
            identity.login("1234567890123", "before"),
            Err(PatientError::AuthFailure)
        ));
        assert_eq!(count(&db, "password_changes"), 1);
    }
}
