//! Traffic assistant tools over the ontology store
//!
//! - query_ontology: facts about one plate
//! - query_owner: vehicles of an owner plus the high-risk flag
//! - add_vehicle: register a vehicle
//! - update_license: change a license status

use serde_json::{json, Map, Value};

use crate::errors::{BuddyError, Result};
use crate::ontology::{LicenseStatus, NewVehicle, OntologyStore};
use crate::tools::registry::{string_arg, ToolRegistry};
use crate::tools::types::ToolSchema;

/// System instruction for the traffic assistant
pub const TRAFFIC_SYSTEM_PROMPT: &str = "You are a traffic assistant agent backed by a vehicle \
ontology. Use query_ontology and query_owner to look facts up, add_vehicle and update_license to \
record events.\nRules:\n1. A vehicle whose license_status is \"expired\" is in violation.\n\
2. An owner with two or more expired vehicles is high risk.\nAnswer in Traditional Chinese.";

/// Store the traffic tools operate on
#[derive(Debug)]
pub struct OntologyContext {
    pub store: OntologyStore,
}

impl OntologyContext {
    pub fn new(store: OntologyStore) -> Self {
        Self { store }
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    string_arg(args, key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BuddyError::ParseError(format!("{} must be a non-empty string", key)))
}

fn query_ontology(ctx: &mut OntologyContext, args: &Map<String, Value>) -> Result<Value> {
    let plate = required_str(args, "plate")?;
    Ok(match ctx.store.vehicle_facts(plate)? {
        Some(facts) => json!({
            "found": true,
            "facts": facts.iter().map(ToString::to_string).collect::<Vec<_>>()
        }),
        None => json!({
            "found": false,
            "facts": [format!("Vehicle {} not found.", plate)]
        }),
    })
}

fn query_owner(ctx: &mut OntologyContext, args: &Map<String, Value>) -> Result<Value> {
    let owner = required_str(args, "owner")?;
    let ontology = ctx.store.load()?;
    let vehicles = ontology.owner_vehicles(owner);
    Ok(json!({
        "found": !vehicles.is_empty(),
        "vehicles": vehicles,
        "high_risk": ontology.is_high_risk(owner),
    }))
}

fn add_vehicle(ctx: &mut OntologyContext, args: &Map<String, Value>) -> Result<Value> {
    let plate = required_str(args, "plate")?;
    let vehicle_type = required_str(args, "type")?;

    let mut vehicle = NewVehicle::new(plate, vehicle_type);
    if let Some(status) = string_arg(args, "license_status") {
        vehicle = vehicle.with_status(status.parse()?);
    }
    if let Some(owner) = string_arg(args, "owner").map(str::trim).filter(|o| !o.is_empty()) {
        vehicle = vehicle.with_owner(owner);
    }

    let record = ctx.store.add_vehicle(vehicle)?;
    Ok(json!({
        "status": "ok",
        "message": format!("Added vehicle {}", plate),
        "vehicle": record,
    }))
}

fn update_license(ctx: &mut OntologyContext, args: &Map<String, Value>) -> Result<Value> {
    let plate = required_str(args, "plate")?;
    let status: LicenseStatus = required_str(args, "license_status")?.parse()?;
    let previous = ctx.store.update_license(plate, status)?;
    Ok(json!({
        "status": "ok",
        "message": format!("{} license status: {} -> {}", plate, previous, status),
    }))
}

/// Registry with the four traffic tools
pub fn ontology_tools() -> ToolRegistry<OntologyContext> {
    ToolRegistry::new()
        .with(
            ToolSchema::new(
                "query_ontology",
                "Query the ontology facts of a single vehicle",
                json!({
                    "type": "object",
                    "properties": {
                        "plate": {"type": "string", "description": "License plate, e.g. ABC123"}
                    },
                    "required": ["plate"]
                }),
            ),
            query_ontology,
        )
        .with(
            ToolSchema::new(
                "query_owner",
                "Query which vehicles an owner has and their license status",
                json!({
                    "type": "object",
                    "properties": {
                        "owner": {"type": "string", "description": "Owner name"}
                    },
                    "required": ["owner"]
                }),
            ),
            query_owner,
        )
        .with(
            ToolSchema::new(
                "add_vehicle",
                "Register a new vehicle in the ontology",
                json!({
                    "type": "object",
                    "properties": {
                        "plate": {"type": "string", "description": "License plate"},
                        "type": {"type": "string", "description": "Vehicle type, e.g. car, motorcycle, truck"},
                        "license_status": {"type": "string", "enum": ["valid", "expired"]},
                        "owner": {"type": "string", "description": "Owner name"}
                    },
                    "required": ["plate", "type"]
                }),
            ),
            add_vehicle,
        )
        .with(
            ToolSchema::new(
                "update_license",
                "Update the license status of a registered vehicle",
                json!({
                    "type": "object",
                    "properties": {
                        "plate": {"type": "string", "description": "License plate"},
                        "license_status": {"type": "string", "enum": ["valid", "expired"]}
                    },
                    "required": ["plate", "license_status"]
                }),
            ),
            update_license,
        )
}
