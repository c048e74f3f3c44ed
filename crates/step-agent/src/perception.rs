use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry of the per-step indexed element list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveElement {
    pub index: usize,
    pub tag: String,
    pub description: String,
}

impl InteractiveElement {
    pub fn new(index: usize, tag: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            index,
            tag: tag.into(),
            description: description.into(),
        }
    }
}

impl fmt::Display for InteractiveElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] <{}> {}", self.index, self.tag, self.description)
    }
}

/// Snapshot of the external state handed to the model for a single step.
///
/// Element indexes are only meaningful against the perception that produced
/// them; a fresh perception is taken for every step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Perception {
    pub url: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub elements: Vec<InteractiveElement>,
    pub screenshot: Option<String>,
    pub text: Option<String>,
}

impl Perception {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn element(&self, index: usize) -> Option<&InteractiveElement> {
        self.elements.get(index)
    }

    pub fn render_elements(&self) -> String {
        if self.elements.is_empty() {
            return "(no interactive elements)".to_string();
        }
        self.elements
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(url) = &self.url {
            out.push_str(&format!("- URL: {url}\n"));
        }
        if let Some(title) = &self.title {
            out.push_str(&format!("- Title: {title}\n"));
        }
        if self.url.is_some() || !self.elements.is_empty() {
            out.push_str("- Interactive Elements:\n");
            out.push_str(&self.render_elements());
            out.push('\n');
        }
        if let Some(text) = &self.text {
            out.push_str(text);
            out.push('\n');
        }
        if out.is_empty() {
            out.push_str("(nothing observed)\n");
        }
        out
    }
}

/// Produces a fresh perception at the start of every step.
#[async_trait]
pub trait PerceptionSource: Send + Sync {
    async fn perceive(&self) -> Result<Perception>;
}

/// Perception that never changes, for demos without a visual environment.
#[derive(Debug, Clone, Default)]
pub struct StaticPerception(pub Perception);

#[async_trait]
impl PerceptionSource for StaticPerception {
    async fn perceive(&self) -> Result<Perception> {
        Ok(self.0.clone())
    }
}
