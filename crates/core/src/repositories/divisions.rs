//! Thai administrative-division reference data.
//!
//! Loaded once at startup into an immutable [`DivisionDirectory`] and shared read-only by the
//! address lookups. The dataset is YAML:
//!
//! ```yaml
//! provinces:
//!   - name: เชียงใหม่
//!     districts:
//!       - name: เมืองเชียงใหม่
//!         subdistricts: [ศรีภูมิ, พระสิงห์]
//! ```

use crate::constants::EMBEDDED_DIVISIONS;
use crate::{PatientError, PatientResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatasetFile {
    provinces: Vec<Province>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Province {
    name: String,
    #[serde(default)]
    districts: Vec<District>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct District {
    name: String,
    #[serde(default)]
    subdistricts: Vec<String>,
}

/// Read-only province → district → subdistrict lookup.
#[derive(Debug)]
pub struct DivisionDirectory {
    provinces: Vec<Province>,
}

impl DivisionDirectory {
    /// The dataset compiled into the crate.
    pub fn embedded() -> PatientResult<Self> {
        Self::parse(EMBEDDED_DIVISIONS)
    }

    /// Loads `path` if given, otherwise the embedded dataset.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::DatasetRead` / `DatasetParse` if the file cannot be read or is not
    /// a valid dataset.
    pub fn load(path: Option<&Path>) -> PatientResult<Self> {
        let directory = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(PatientError::DatasetRead)?;
                Self::parse(&raw)?
            }
            None => Self::embedded()?,
        };

        tracing::info!(
            "loaded division dataset: {} provinces, {} districts",
            directory.provinces.len(),
            directory
                .provinces
                .iter()
                .map(|p| p.districts.len())
                .sum::<usize>()
        );
        Ok(directory)
    }

    /// Parses a YAML dataset; names are trimmed and blank names rejected.
    pub fn parse(yaml: &str) -> PatientResult<Self> {
        let mut file: DatasetFile = serde_yaml::from_str(yaml).map_err(PatientError::DatasetParse)?;

        for province in &mut file.provinces {
            province.name = required_name(&province.name, "province")?;
            for district in &mut province.districts {
                district.name = required_name(&district.name, "district")?;
                for subdistrict in &mut district.subdistricts {
                    *subdistrict = required_name(subdistrict, "subdistrict")?;
                }
            }
        }

        Ok(Self {
            provinces: file.provinces,
        })
    }

    /// Province names in dataset order.
    pub fn provinces(&self) -> Vec<String> {
        self.provinces.iter().map(|p| p.name.clone()).collect()
    }

    /// District names of `province`; empty if the province is unknown.
    pub fn districts_of(&self, province: &str) -> BTreeSet<String> {
        let province = province.trim();
        self.provinces
            .iter()
            .filter(|p| p.name == province)
            .flat_map(|p| p.districts.iter().map(|d| d.name.clone()))
            .collect()
    }

    /// Subdistrict names of `district` in dataset order; empty if the district is unknown.
    ///
    /// District names are unique nationally in practice; if a dataset repeats one, the
    /// subdistricts of every match are returned in dataset order.
    pub fn subdistricts_of(&self, district: &str) -> Vec<String> {
        let district = district.trim();
        self.provinces
            .iter()
            .flat_map(|p| p.districts.iter())
            .filter(|d| d.name == district)
            .flat_map(|d| d.subdistricts.iter().cloned())
            .collect()
    }
}

fn required_name(name: &str, level: &str) -> PatientResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PatientError::InvalidInput(format!(
            "division dataset contains a blank {level} name"
        )));
    }
    Ok(trimmed.to_string())
}
