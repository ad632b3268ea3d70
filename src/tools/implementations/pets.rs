//! Pet name memory
//!
//! - save_pet_info: remember the name of the user's dog
//! - get_pet_name: recall it

use serde_json::json;

use crate::errors::BuddyError;
use crate::tools::registry::{string_arg, ToolRegistry};
use crate::tools::types::ToolSchema;

/// System instruction for the pet conversation
pub const PET_SYSTEM_PROMPT: &str = "You are a friendly assistant that remembers the name of the \
user's dog. Call save_pet_info when the user tells you the name and get_pet_name when asked for it.";

/// State mutated by the pet tools, alive for one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetContext {
    pub name: Option<String>,
}

/// Registry with `save_pet_info` and `get_pet_name`
pub fn pet_tools() -> ToolRegistry<PetContext> {
    ToolRegistry::new()
        .with(
            ToolSchema::new(
                "save_pet_info",
                "Save the name of the user's dog",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "The dog's name"}
                    },
                    "required": ["name"]
                }),
            ),
            |ctx: &mut PetContext, args| {
                let name = string_arg(args, "name")
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| BuddyError::ParseError("name must be a non-empty string".to_string()))?;

                tracing::info!(pet = name, "saved pet name");
                ctx.name = Some(name.to_string());
                Ok(json!({
                    "status": "ok",
                    "message": format!("Recorded the dog's name: {}", name)
                }))
            },
        )
        .with(
            ToolSchema::no_args("get_pet_name", "Get the recorded name of the user's dog"),
            |ctx: &mut PetContext, _| {
                Ok(match &ctx.name {
                    Some(name) => json!({"status": "ok", "name": name}),
                    None => json!({"status": "empty", "message": "No dog name has been recorded yet"}),
                })
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_get_before_save_is_empty() {
        let tools = pet_tools();
        let mut ctx = PetContext::default();
        let out = tools.invoke("get_pet_name", &mut ctx, &Map::new()).unwrap().unwrap();
        assert_eq!(out["status"], "empty");
    }

    #[test]
    fn test_save_then_get() {
        let tools = pet_tools();
        let mut ctx = PetContext::default();
        let mut args = Map::new();
        args.insert("name".into(), json!("Rex"));

        let saved = tools.invoke("save_pet_info", &mut ctx, &args).unwrap().unwrap();
        assert_eq!(saved["status"], "ok");
        assert_eq!(ctx.name.as_deref(), Some("Rex"));

        let out = tools.invoke("get_pet_name", &mut ctx, &Map::new()).unwrap().unwrap();
        assert_eq!(out, json!({"status": "ok", "name": "Rex"}));
    }

    #[test]
    fn test_save_rejects_non_string() {
        let tools = pet_tools();
        let mut ctx = PetContext::default();
        let mut args = Map::new();
        args.insert("name".into(), json!(7));
        assert!(tools.invoke("save_pet_info", &mut ctx, &args).unwrap().is_err());
        assert!(ctx.name.is_none());
    }
}
