use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;

/// The request being judged: a message, the caller's role and any extra context.
///
/// Created by the caller for one evaluation and only read by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub message: String,
    #[serde(default, alias = "user_role")]
    pub user_role: Option<String>,
    #[serde(default, alias = "context")]
    pub fields: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.user_role = Some(role.into());
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Load a request from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let context = serde_json::from_str(&content)?;
        Ok(context)
    }

    /// The caller role, or an empty string when none was given.
    pub fn role(&self) -> &str {
        self.user_role.as_deref().unwrap_or("")
    }

    /// Looks up a context value by name. `message` and `userRole` resolve to
    /// the request itself; anything else comes from the free-form fields.
    pub fn lookup(&self, name: &str) -> Value {
        match name {
            "message" => Value::String(self.message.clone()),
            "userRole" | "role" => self
                .user_role
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
            _ => self.fields.get(name).cloned().unwrap_or(Value::Null),
        }
    }
}
