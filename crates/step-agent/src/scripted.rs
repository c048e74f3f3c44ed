use std::collections::VecDeque;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::language_model::{LanguageModelClient, LanguageModelResponse, ModelRequest};

/// Model client that replays a fixed queue of responses.
///
/// Used by the demos (responses come from a script file) and by tests. Every
/// request is kept so callers can inspect what the controller rendered.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Builds a script from JSON values. Strings are replayed as-is, any other
    /// value is serialized first.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::new(values.into_iter().map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        }))
    }

    /// Loads a script file holding a JSON array of responses.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model script {}", path.display()))?;
        let values: Vec<Value> = serde_json::from_str(&raw)
            .with_context(|| format!("model script {} is not a JSON array", path.display()))?;
        Ok(Self::from_values(values))
    }

    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }

    pub async fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl LanguageModelClient for ScriptedModel {
    async fn complete(&self, request: &ModelRequest) -> Result<LanguageModelResponse> {
        self.requests.lock().await.push(request.clone());
        let next = self
            .responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow!("scripted model ran out of responses"))?;
        Ok(LanguageModelResponse::new(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language_model::ModelOptions;
    use serde_json::json;
    use std::io::Write;

    fn request() -> ModelRequest {
        ModelRequest {
            system_prompt: "system".into(),
            context: "context".into(),
            screenshot: None,
            options: ModelOptions::default(),
        }
    }

    #[tokio::test]
    async fn replays_in_order_then_fails() {
        let model = ScriptedModel::from_values(vec![json!("first"), json!({ "action": "done" })]);
        assert_eq!(model.complete(&request()).await.unwrap().text, "first");
        let second = model.complete(&request()).await.unwrap().text;
        assert_eq!(
            serde_json::from_str::<Value>(&second).unwrap(),
            json!({ "action": "done" })
        );
        assert!(model.complete(&request()).await.is_err());
        assert_eq!(model.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn loads_script_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["one", {{"action": "screenshot"}}]"#).unwrap();
        let model = ScriptedModel::from_file(file.path()).unwrap();
        assert_eq!(model.remaining().await, 2);
    }

    #[test]
    fn rejects_non_array_script() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"action": "done"}}"#).unwrap();
        assert!(ScriptedModel::from_file(file.path()).is_err());
    }
}
