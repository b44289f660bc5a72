/// Failure taxonomy exposed to callers.
///
/// Every [`PatientError`] falls into exactly one kind; the REST layer maps kinds to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing required input.
    ValidationFailure,
    /// Registration (or identity change) with an identity number that already has an account.
    DuplicateIdentity,
    /// Unknown identity or wrong password; callers cannot tell the two apart.
    AuthFailure,
    /// Referenced patient, account or appointment does not exist.
    NotFound,
    /// Storage, hashing or configuration failure.
    InternalFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("an account with this identity number already exists")]
    DuplicateIdentity,
    #[error("invalid identity number or password")]
    AuthFailure,
    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("failed to encode evaluation result: {0}")]
    ResultEncoding(serde_json::Error),
    #[error("failed to read division dataset: {0}")]
    DatasetRead(std::io::Error),
    #[error("failed to parse division dataset: {0}")]
    DatasetParse(serde_yaml::Error),
    #[error("failed to read config file: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to parse config file: {0}")]
    ConfigParse(serde_yaml::Error),
}

impl PatientError {
    /// Returns the taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PatientError::InvalidInput(_) => ErrorKind::ValidationFailure,
            PatientError::DuplicateIdentity => ErrorKind::DuplicateIdentity,
            PatientError::AuthFailure => ErrorKind::AuthFailure,
            PatientError::NotFound(_) => ErrorKind::NotFound,
            PatientError::Database(_)
            | PatientError::PasswordHash(_)
            | PatientError::ResultEncoding(_)
            | PatientError::DatasetRead(_)
            | PatientError::DatasetParse(_)
            | PatientError::ConfigRead(_)
            | PatientError::ConfigParse(_) => ErrorKind::InternalFailure,
        }
    }

    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        PatientError::NotFound(what.into())
    }
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;
