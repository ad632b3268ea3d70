//! Tool implementations module

pub mod lights;
pub mod ontology;
pub mod pets;

// Re-export for convenience
pub use lights::{light_tools, LightContext, LightStatus, LIGHT_SYSTEM_PROMPT};
pub use ontology::{ontology_tools, OntologyContext, TRAFFIC_SYSTEM_PROMPT};
pub use pets::{pet_tools, PetContext, PET_SYSTEM_PROMPT};
