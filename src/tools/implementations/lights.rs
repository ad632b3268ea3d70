//! Light switch tools

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tools::registry::ToolRegistry;
use crate::tools::types::ToolSchema;

/// System instruction for the light conversation
pub const LIGHT_SYSTEM_PROMPT: &str = "You control the light in the user's room. Call turn_on_light \
or turn_off_light when the user asks for it, otherwise just chat.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightStatus {
    On,
    #[default]
    Off,
}

impl std::fmt::Display for LightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LightStatus::On => write!(f, "on"),
            LightStatus::Off => write!(f, "off"),
        }
    }
}

/// Light state; starts off
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightContext {
    pub status: LightStatus,
}

/// Registry with `turn_on_light` and `turn_off_light`
pub fn light_tools() -> ToolRegistry<LightContext> {
    ToolRegistry::new()
        .with(
            ToolSchema::no_args("turn_on_light", "Turn the light on to brighten the room"),
            |ctx: &mut LightContext, _| {
                ctx.status = LightStatus::On;
                tracing::info!("light on");
                Ok(json!({"status": "ok", "message": "The light is on now."}))
            },
        )
        .with(
            ToolSchema::no_args("turn_off_light", "Turn the light off to darken the room"),
            |ctx: &mut LightContext, _| {
                ctx.status = LightStatus::Off;
                tracing::info!("light off");
                Ok(json!({"status": "ok", "message": "The light is off now. Good night."}))
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_starts_off() {
        assert_eq!(LightContext::default().status, LightStatus::Off);
    }

    #[test]
    fn test_toggle_and_reassert() {
        let tools = light_tools();
        let mut ctx = LightContext::default();
        let args = Map::new();

        tools.invoke("turn_on_light", &mut ctx, &args).unwrap().unwrap();
        assert_eq!(ctx.status, LightStatus::On);

        // already on; still ok
        let out = tools.invoke("turn_on_light", &mut ctx, &args).unwrap().unwrap();
        assert_eq!(out["status"], "ok");
        assert_eq!(ctx.status, LightStatus::On);

        tools.invoke("turn_off_light", &mut ctx, &args).unwrap().unwrap();
        assert_eq!(ctx.status, LightStatus::Off);
    }

    #[test]
    fn test_declarations_have_no_parameters() {
        for schema in light_tools().schemas() {
            assert!(!schema.has_parameters());
        }
    }
}
