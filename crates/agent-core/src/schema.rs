//! Output Schema
//!
//! Declared shape of the final answer. The relay loop asks the model for a
//! JSON object and checks it against this schema before returning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};

/// Primitive JSON type of a response field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Number => write!(f, "number"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub description: String,

    #[serde(default = "default_required")]
    pub required: bool,
}

const fn default_required() -> bool {
    true
}

impl FieldSchema {
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::String,
            description: description.into(),
            required: true,
        }
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Number,
            description: description.into(),
            required: true,
        }
    }
}

/// Named set of fields the final answer must carry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Instruction block appended to the system prompt
    pub fn prompt_section(&self) -> String {
        let mut prompt = format!("## Final Answer ({})\n\n", self.name);
        prompt.push_str("When you have everything you need, reply with only a JSON object in a ```json block with these fields:\n\n");
        for field in &self.fields {
            let required = if field.required { " (required)" } else { "" };
            prompt.push_str(&format!(
                "- `{}` ({}){}: {}\n",
                field.name, field.field_type, required, field.description
            ));
        }
        prompt
    }

    /// Pull a JSON object out of model output: a ```json block first, then
    /// the outermost braces.
    pub fn extract(content: &str) -> Option<Value> {
        const FENCE: &str = "```json";

        if let Some(start) = content.find(FENCE) {
            let after = &content[start + FENCE.len()..];
            if let Some(end) = after.find("```") {
                if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(after[..end].trim()) {
                    return Some(value);
                }
            }
        }

        let start = content.find('{')?;
        let end = content.rfind('}')?;
        if end <= start {
            return None;
        }
        match serde_json::from_str::<Value>(&content[start..=end]) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        }
    }

    /// Check `value` against the schema. Numeric strings are coerced for
    /// number fields; unknown keys are dropped.
    pub fn validate(&self, value: Value) -> Result<Value> {
        let Value::Object(mut object) = value else {
            return Err(AgentError::Schema(format!("{} must be a JSON object", self.name)));
        };

        let mut out = Map::new();
        for field in &self.fields {
            match object.remove(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(AgentError::Schema(format!("missing field `{}`", field.name)));
                }
                None | Some(Value::Null) => {}
                Some(v) => {
                    out.insert(field.name.clone(), coerce(field, v)?);
                }
            }
        }

        Ok(Value::Object(out))
    }
}

fn coerce(field: &FieldSchema, value: Value) -> Result<Value> {
    match (field.field_type, value) {
        (FieldType::String, v @ Value::String(_)) => Ok(v),
        (FieldType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (FieldType::Number, v @ Value::Number(_)) => Ok(v),
        (FieldType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| AgentError::Schema(format!("field `{}` is not a number: {s}", field.name))),
        (t, other) => Err(AgentError::Schema(format!(
            "field `{}` expected {t}, got {other}",
            field.name
        ))),
    }
}
