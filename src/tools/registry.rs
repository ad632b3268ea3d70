//! Tool registry
//!
//! Maps a function name to its declaration and a local handler. The
//! registry is generic over the context object the handlers mutate, so
//! state lives in a value the caller owns instead of module globals.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::Result;
use crate::tools::types::ToolSchema;

/// Local operation behind a declared tool
pub type ToolHandler<C> = Box<dyn Fn(&mut C, &Map<String, Value>) -> Result<Value> + Send + Sync>;

struct RegisteredTool<C> {
    schema: ToolSchema,
    handler: ToolHandler<C>,
}

/// Tool registry
pub struct ToolRegistry<C> {
    /// Map of tool name to declaration + handler
    tools: BTreeMap<String, RegisteredTool<C>>,
}

impl<C> std::fmt::Debug for ToolRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

impl<C> ToolRegistry<C> {
    /// Create empty registry
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool, replacing any previous one with the same name
    pub fn register<F>(&mut self, schema: ToolSchema, handler: F)
    where
        F: Fn(&mut C, &Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.tools.insert(
            schema.name.clone(),
            RegisteredTool {
                schema,
                handler: Box::new(handler),
            },
        );
    }

    /// Builder-style register
    pub fn with<F>(mut self, schema: ToolSchema, handler: F) -> Self
    where
        F: Fn(&mut C, &Map<String, Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(schema, handler);
        self
    }

    /// Get tool schema by name
    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name).map(|t| &t.schema)
    }

    /// Check if tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Declarations to send with each request
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema.clone()).collect()
    }

    /// Required keys of `name` absent from `args`
    ///
    /// Presence only; argument types are not checked or coerced.
    pub fn missing_required(&self, name: &str, args: &Map<String, Value>) -> Vec<String> {
        self.get(name)
            .map(|schema| {
                schema
                    .required()
                    .into_iter()
                    .filter(|key| !args.contains_key(*key))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Run the handler for `name`; `None` when the name is unknown
    pub fn invoke(&self, name: &str, context: &mut C, args: &Map<String, Value>) -> Option<Result<Value>> {
        self.tools.get(name).map(|t| (t.handler)(context, args))
    }

    /// Get total number of tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl<C> Default for ToolRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// String argument accessor shared by the handlers
pub fn string_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Counter {
        hits: u32,
    }

    fn registry() -> ToolRegistry<Counter> {
        ToolRegistry::new()
            .with(ToolSchema::no_args("bump", "Increment the counter"), |ctx: &mut Counter, _| {
                ctx.hits += 1;
                Ok(json!({"status": "ok", "hits": ctx.hits}))
            })
            .with(
                ToolSchema::new(
                    "echo",
                    "Echo a word",
                    json!({
                        "type": "object",
                        "properties": {"word": {"type": "string"}},
                        "required": ["word"]
                    }),
                ),
                |_, args| Ok(json!({"word": string_arg(args, "word")})),
            )
    }

    #[test]
    fn test_registry_creation() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert_eq!(registry.tool_names(), vec!["bump", "echo"]);
    }

    #[test]
    fn test_invoke_mutates_context() {
        let registry = registry();
        let mut ctx = Counter::default();
        registry.invoke("bump", &mut ctx, &Map::new()).unwrap().unwrap();
        let out = registry.invoke("bump", &mut ctx, &Map::new()).unwrap().unwrap();
        assert_eq!(out["hits"], 2);
        assert_eq!(ctx.hits, 2);
    }

    #[test]
    fn test_nonexistent_tool() {
        let registry = registry();
        let mut ctx = Counter::default();
        assert!(!registry.contains("nonexistent_tool"));
        assert!(registry.invoke("nonexistent_tool", &mut ctx, &Map::new()).is_none());
    }

    #[test]
    fn test_missing_required() {
        let registry = registry();
        assert_eq!(registry.missing_required("echo", &Map::new()), vec!["word"]);

        let mut args = Map::new();
        args.insert("word".into(), json!(42));
        // presence only, no type check
        assert!(registry.missing_required("echo", &args).is_empty());
    }

    #[test]
    fn test_schemas() {
        for schema in registry().schemas() {
            assert!(!schema.name.is_empty());
            assert!(!schema.description.is_empty());
        }
    }
}
