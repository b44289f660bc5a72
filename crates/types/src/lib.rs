//! # Outreach Types
//!
//! Validated value types shared by the outreach crates.
//!
//! Identity numbers and phone numbers are held in their canonical digits-only form. The
//! punctuated display forms exist only for presentation and are never stored or compared.

/// Number of digits in a national identity number.
pub const NATIONAL_ID_LEN: usize = 13;

/// Number of digits in a phone number.
pub const PHONE_NUMBER_LEN: usize = 10;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The identity number did not normalise to exactly 13 digits
    #[error("identity number must contain exactly 13 digits")]
    InvalidNationalId,
    /// The phone number did not normalise to exactly 10 digits
    #[error("phone number must contain exactly 10 digits")]
    InvalidPhoneNumber,
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(NonEmptyText)` if the trimmed input is non-empty,
    /// or `Err(TextError::Empty)` if it's empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Strips the punctuation clients are allowed to send (hyphens and whitespace).
fn strip_separators(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

fn is_digits_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// A national identity number in canonical digits-only form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NationalId(String);

impl NationalId {
    /// Normalises `input` to digits only and checks that exactly 13 digits remain.
    ///
    /// Accepts the display form (`1-2345-67890-12-3`) as well as raw digits.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for blank input and `TextError::InvalidNationalId` when the
    /// normalised value is not 13 ASCII digits.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let digits = strip_separators(input.as_ref());
        if digits.is_empty() {
            return Err(TextError::Empty);
        }
        if !is_digits_of_len(&digits, NATIONAL_ID_LEN) {
            return Err(TextError::InvalidNationalId);
        }
        Ok(Self(digits))
    }

    /// Returns the canonical digits-only form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NationalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NationalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A phone number in canonical digits-only form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Normalises `input` to digits only and checks that exactly 10 digits remain.
    ///
    /// # Errors
    ///
    /// Returns `TextError::Empty` for blank input and `TextError::InvalidPhoneNumber` when the
    /// normalised value is not 10 ASCII digits.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let digits = strip_separators(input.as_ref());
        if digits.is_empty() {
            return Err(TextError::Empty);
        }
        if !is_digits_of_len(&digits, PHONE_NUMBER_LEN) {
            return Err(TextError::InvalidPhoneNumber);
        }
        Ok(Self(digits))
    }

    /// Returns the canonical digits-only form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Splits `digits` into hyphen-joined groups of the given sizes.
///
/// Returns `None` unless `digits` is exactly `sum(groups)` ASCII digits.
fn group_digits(digits: &str, groups: &[usize]) -> Option<String> {
    if !is_digits_of_len(digits, groups.iter().sum()) {
        return None;
    }
    let mut parts = Vec::with_capacity(groups.len());
    let mut start = 0;
    for size in groups {
        parts.push(&digits[start..start + size]);
        start += size;
    }
    Some(parts.join("-"))
}

/// Formats a stored identity number as `X-XXXX-XXXXX-XX-X`.
///
/// Values that are not exactly 13 digits are returned unchanged.
pub fn format_national_id(stored: &str) -> String {
    group_digits(stored, &[1, 4, 5, 2, 1]).unwrap_or_else(|| stored.to_string())
}

/// Formats a stored phone number as `XXX-XXX-XXXX`.
///
/// Values that are not exactly 10 digits are returned unchanged.
pub fn format_phone_number(stored: &str) -> String {
    group_digits(stored, &[3, 3, 4]).unwrap_or_else(|| stored.to_string())
}
