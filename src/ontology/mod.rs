//! Ontology stores
//!
//! Two small YAML-backed knowledge stores:
//! - Vehicles, owners and rules for the traffic assistant
//! - Device state for the home theater assistant

pub mod types;
pub mod facts;
pub mod store;
pub mod home;

pub use facts::{extract_plate, Fact, OwnedVehicle, ViolationCheck, HIGH_RISK_EXPIRED_COUNT};
pub use home::{AgentState, Device, HomeTheater, HomeTheaterStore};
pub use store::OntologyStore;
pub use types::{LicenseStatus, NewVehicle, Ontology, Owner, Vehicle};
