//! Ontology document types
//!
//! On disk:
//!
//! ```yaml
//! vehicles:
//!   ABC123:
//!     type: car
//!     license_status: expired
//!     owner: Alice
//! owners:
//!   Alice:
//!     note: new owner added
//! rules:
//!   expired_license: expired license means violation
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::BuddyError;

/// Registration state of a vehicle license
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Valid,
    Expired,
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Valid => "valid",
            LicenseStatus::Expired => "expired",
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, LicenseStatus::Expired)
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = BuddyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "valid" => Ok(LicenseStatus::Valid),
            "expired" => Ok(LicenseStatus::Expired),
            other => Err(BuddyError::ParseError(format!(
                "license status must be 'valid' or 'expired', got '{}'",
                other
            ))),
        }
    }
}

/// A registered vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub license_status: LicenseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// Owner metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

/// The whole ontology document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ontology {
    #[serde(default)]
    pub vehicles: BTreeMap<String, Vehicle>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub owners: BTreeMap<String, Owner>,
    /// Free-form rule descriptions, kept as written
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, serde_yaml::Value>,
}

/// Input for registering a vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct NewVehicle {
    pub plate: String,
    pub vehicle_type: String,
    pub license_status: LicenseStatus,
    pub owner: Option<String>,
}

impl NewVehicle {
    /// New vehicle with a valid license and no owner
    pub fn new(plate: impl Into<String>, vehicle_type: impl Into<String>) -> Self {
        Self {
            plate: plate.into(),
            vehicle_type: vehicle_type.into(),
            license_status: LicenseStatus::Valid,
            owner: None,
        }
    }

    pub fn with_status(mut self, status: LicenseStatus) -> Self {
        self.license_status = status;
        self
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub(crate) fn into_record(self) -> (String, Vehicle) {
        (
            self.plate,
            Vehicle {
                vehicle_type: self.vehicle_type,
                license_status: self.license_status,
                owner: self.owner,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_status_parse() {
        assert_eq!("valid".parse::<LicenseStatus>().unwrap(), LicenseStatus::Valid);
        assert_eq!(" Expired ".parse::<LicenseStatus>().unwrap(), LicenseStatus::Expired);
        assert!(matches!(
            "suspended".parse::<LicenseStatus>(),
            Err(BuddyError::ParseError(_))
        ));
    }

    #[test]
    fn test_ontology_yaml_shape() {
        let yaml = r#"
vehicles:
  ABC123:
    type: car
    license_status: expired
    owner: Alice
  XYZ789:
    type: motorcycle
    license_status: valid
rules:
  expired_license: expired license means violation
"#;
        let ontology: Ontology = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(ontology.vehicles.len(), 2);
        assert_eq!(ontology.vehicles["ABC123"].vehicle_type, "car");
        assert!(ontology.vehicles["XYZ789"].owner.is_none());
        assert!(ontology.owners.is_empty());
        assert!(ontology.rules.contains_key("expired_license"));
    }

    #[test]
    fn test_unknown_status_in_file_rejected() {
        let yaml = "vehicles:\n  A1B:\n    type: car\n    license_status: unknown\n";
        assert!(serde_yaml::from_str::<Ontology>(yaml).is_err());
    }

    #[test]
    fn test_serialize_omits_empty_sections() {
        let mut ontology = Ontology::default();
        let (plate, vehicle) = NewVehicle::new("ABC123", "car").into_record();
        ontology.vehicles.insert(plate, vehicle);

        let yaml = serde_yaml::to_string(&ontology).unwrap();
        assert!(yaml.contains("type: car"));
        assert!(!yaml.contains("owners"));
        assert!(!yaml.contains("owner:"));
    }
}
