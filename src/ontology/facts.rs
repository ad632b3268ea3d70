//! Read-only reasoning over an ontology snapshot

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::ontology::types::{LicenseStatus, Ontology, Vehicle};

/// Expired vehicles an owner needs to be flagged high risk
pub const HIGH_RISK_EXPIRED_COUNT: usize = 2;

/// `(subject, predicate, object)` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fact {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Fact {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

/// Outcome of the expired-license rule for one plate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationCheck {
    Violation,
    Compliant,
    UnknownPlate,
}

/// Vehicle owned by someone, as reported to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedVehicle {
    pub plate: String,
    pub license_status: LicenseStatus,
}

impl Ontology {
    pub fn vehicle(&self, plate: &str) -> Option<&Vehicle> {
        self.vehicles.get(plate)
    }

    /// Status, type and owner triples for a plate
    pub fn vehicle_facts(&self, plate: &str) -> Option<Vec<Fact>> {
        let vehicle = self.vehicle(plate)?;
        Some(vec![
            Fact::new(plate, "license_status", vehicle.license_status.as_str()),
            Fact::new(plate, "type", &vehicle.vehicle_type),
            Fact::new(plate, "owner", vehicle.owner.as_deref().unwrap_or("unknown")),
        ])
    }

    /// An expired license is a violation
    pub fn check_violation(&self, plate: &str) -> ViolationCheck {
        match self.vehicle(plate) {
            None => ViolationCheck::UnknownPlate,
            Some(v) if v.license_status.is_expired() => ViolationCheck::Violation,
            Some(_) => ViolationCheck::Compliant,
        }
    }

    /// Vehicles whose owner is exactly `owner`, in plate order
    pub fn owner_vehicles(&self, owner: &str) -> Vec<OwnedVehicle> {
        self.vehicles
            .iter()
            .filter(|(_, v)| v.owner.as_deref() == Some(owner))
            .map(|(plate, v)| OwnedVehicle {
                plate: plate.clone(),
                license_status: v.license_status,
            })
            .collect()
    }

    pub fn is_high_risk(&self, owner: &str) -> bool {
        self.owner_vehicles(owner)
            .iter()
            .filter(|v| v.license_status.is_expired())
            .count()
            >= HIGH_RISK_EXPIRED_COUNT
    }
}

/// First run of three or more uppercase letters or digits
pub fn extract_plate(text: &str) -> Option<&str> {
    static PLATE: OnceLock<Regex> = OnceLock::new();
    PLATE
        .get_or_init(|| Regex::new(r"[A-Z0-9]{3,}").expect("plate pattern is valid"))
        .find(text)
        .map(|m| m.as_str())
}
