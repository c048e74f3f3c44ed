use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One required parameter of an effector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub description: String,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectorDescription {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
}

impl EffectorDescription {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<ParamSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params,
            metadata: IndexMap::default(),
        }
    }

    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|param| {
                (
                    param.name.clone(),
                    json!({ "type": param.kind.as_str(), "description": param.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self.params.iter().map(|param| param.name.as_str()).collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }

    /// Checks that `args` carries exactly the declared parameters with the
    /// declared kinds.
    pub fn validate_args(&self, args: &Map<String, Value>) -> Result<(), String> {
        for param in &self.params {
            match args.get(&param.name) {
                None => return Err(format!("missing parameter `{}`", param.name)),
                Some(value) if !param.kind.accepts(value) => {
                    return Err(format!(
                        "parameter `{}` must be a {}, got {}",
                        param.name, param.kind, value
                    ))
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = args
            .keys()
            .find(|key| !self.params.iter().any(|param| &param.name == *key))
        {
            return Err(format!("unexpected parameter `{extra}`"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectorOutput {
    pub content: Value,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
}

impl EffectorOutput {
    pub fn new(content: impl Into<Value>) -> Self {
        Self {
            content: content.into(),
            metadata: IndexMap::default(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(Value::String(content.into()))
    }

    /// Text folded into the step history.
    pub fn summary(&self) -> String {
        match &self.content {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EffectorError {
    #[error("effector failed: {0}")]
    Failed(String),
    #[error("effector rejected input: {0}")]
    InvalidInput(String),
    /// The backing service (browser, API) cannot be reached. Not recoverable
    /// within the run.
    #[error("effector backend unavailable: {0}")]
    Unavailable(String),
}

pub type EffectorResult = Result<EffectorOutput, EffectorError>;

/// A named capability invoked by the controller: a tool function or a
/// browser primitive.
#[async_trait]
pub trait Effector: Send + Sync {
    fn description(&self) -> &EffectorDescription;
    async fn invoke(&self, args: Value) -> EffectorResult;
}

#[derive(Clone, Default)]
pub struct EffectorRegistry {
    effectors: IndexMap<String, Arc<dyn Effector>>,
}

impl EffectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an effector under its description name, replacing any
    /// earlier one with the same name.
    pub fn register(&mut self, effector: Arc<dyn Effector>) {
        let name = effector.description().name.clone();
        self.effectors.insert(name, effector);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Effector>> {
        self.effectors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.effectors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.effectors.keys().map(String::as_str)
    }

    pub fn descriptions(&self) -> Vec<EffectorDescription> {
        self.effectors
            .values()
            .map(|effector| effector.description().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.effectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effectors.is_empty()
    }
}

impl fmt::Debug for EffectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
