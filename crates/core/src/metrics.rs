//! Derived health indices.
//!
//! `bmi = round(weight / (height/100)^2, 2)` and `ratio = round(waist / height, 2)`, with weight
//! in kilograms and height and waist in centimetres.

use crate::{PatientError, PatientResult};

/// Weight, height and waist as submitted by the patient.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurements {
    weight_kg: f64,
    height_cm: f64,
    waist_cm: f64,
}

impl Measurements {
    /// # Errors
    ///
    /// Returns `PatientError::InvalidInput` unless every value is finite and greater than zero.
    pub fn new(weight_kg: f64, height_cm: f64, waist_cm: f64) -> PatientResult<Self> {
        for (name, value) in [
            ("weight", weight_kg),
            ("height", height_cm),
            ("waist", waist_cm),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PatientError::InvalidInput(format!(
                    "{name} must be a positive number"
                )));
            }
        }

        Ok(Self {
            weight_kg,
            height_cm,
            waist_cm,
        })
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn height_cm(&self) -> f64 {
        self.height_cm
    }

    pub fn waist_cm(&self) -> f64 {
        self.waist_cm
    }

    pub fn metrics(&self) -> HealthMetrics {
        HealthMetrics {
            bmi: bmi(self.weight_kg, self.height_cm),
            waist_to_height_ratio: waist_to_height_ratio(self.waist_cm, self.height_cm),
        }
    }
}

/// The values stored in a `health_data` row.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthMetrics {
    pub bmi: f64,
    pub waist_to_height_ratio: f64,
}

/// Rounds half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    round2(weight_kg / (height_m * height_m))
}

pub fn waist_to_height_ratio(waist_cm: f64, height_cm: f64) -> f64 {
    round2(waist_cm / height_cm)
}
