//! Browser primitives exposed to the controller as effectors.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use step_agent::action::{
    CLICK, EXTRACT, INPUT, NAVIGATE, SCREENSHOT, SCROLL, SEARCH_DIRECT, SEND_KEYS,
};
use step_agent::{
    Effector, EffectorDescription, EffectorError, EffectorOutput, EffectorResult,
    LanguageModelClient, ModelOptions, ModelRequest, ParamKind, ParamSpec, SearchSite,
};
use tracing::debug;

use crate::driver::{BrowserDriver, ClickOutcome, DriverError};

/// Page content handed to the extraction model is cut at this many chars.
pub const EXTRACT_CONTENT_LIMIT: usize = 10_000;

const EXTRACT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that extracts information from web pages.";

impl From<DriverError> for EffectorError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Unreachable(message) => EffectorError::Unavailable(message),
            other => EffectorError::Failed(other.to_string()),
        }
    }
}

/// Search results URL for `query` on `site`.
pub fn search_url(site: SearchSite, query: &str) -> String {
    let base = match site {
        SearchSite::Costco => "https://www.costco.com/CatalogSearch?keyword=",
        SearchSite::Amazon => "https://www.amazon.com/s?k=",
        SearchSite::Google => "https://www.google.com/search?q=",
    };
    format!("{base}{}", urlencoding::encode(query))
}

fn truncate_content(content: String) -> String {
    match content.char_indices().nth(EXTRACT_CONTENT_LIMIT) {
        Some((cut, _)) => format!("{}...[truncated]", &content[..cut]),
        None => content,
    }
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T, EffectorError> {
    serde_json::from_value(args)
        .map_err(|e| EffectorError::InvalidInput(format!("invalid arguments: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Primitive {
    Navigate,
    Click,
    Input,
    SendKeys,
    Scroll,
    SearchDirect,
    Screenshot,
}

impl Primitive {
    const ALL: [Primitive; 7] = [
        Primitive::Navigate,
        Primitive::Click,
        Primitive::Input,
        Primitive::SendKeys,
        Primitive::Scroll,
        Primitive::SearchDirect,
        Primitive::Screenshot,
    ];

    fn describe(self) -> EffectorDescription {
        let index = || ParamSpec::new("index", ParamKind::Integer, "Index from the element list");
        match self {
            Self::Navigate => EffectorDescription::new(
                NAVIGATE,
                "Go to a URL",
                vec![ParamSpec::new("url", ParamKind::String, "Complete URL to open")],
            ),
            Self::Click => {
                EffectorDescription::new(CLICK, "Click an element by its index number", vec![index()])
            }
            Self::Input => EffectorDescription::new(
                INPUT,
                "Type text into an input field",
                vec![
                    index(),
                    ParamSpec::new("text", ParamKind::String, "Text to type"),
                ],
            ),
            Self::SendKeys => EffectorDescription::new(
                SEND_KEYS,
                "Press keyboard keys (Enter, Tab, Escape, ...)",
                vec![ParamSpec::new("keys", ParamKind::String, "Key or key combination")],
            ),
            Self::Scroll => EffectorDescription::new(
                SCROLL,
                "Scroll the page up or down",
                vec![
                    ParamSpec::new("down", ParamKind::Boolean, "true scrolls down"),
                    ParamSpec::new("pages", ParamKind::Number, "Pages to scroll, 0.5 is half a page"),
                ],
            ),
            Self::SearchDirect => EffectorDescription::new(
                SEARCH_DIRECT,
                "Search on costco, amazon or google directly (bypasses the UI)",
                vec![
                    ParamSpec::new("site", ParamKind::String, "costco, amazon or google"),
                    ParamSpec::new("query", ParamKind::String, "Search terms"),
                ],
            ),
            Self::Screenshot => EffectorDescription::new(
                SCREENSHOT,
                "Take a screenshot for visual verification",
                vec![],
            ),
        }
    }
}

#[derive(Deserialize)]
struct UrlArgs {
    url: String,
}

#[derive(Deserialize)]
struct IndexArgs {
    index: usize,
}

#[derive(Deserialize)]
struct InputArgs {
    index: usize,
    text: String,
}

#[derive(Deserialize)]
struct KeysArgs {
    keys: String,
}

#[derive(Deserialize)]
struct ScrollArgs {
    down: bool,
    pages: f64,
}

#[derive(Deserialize)]
struct SearchArgs {
    site: SearchSite,
    query: String,
}

#[derive(Deserialize)]
struct ExtractArgs {
    query: String,
}

/// One browser primitive bound to a driver.
pub struct BrowserEffector {
    primitive: Primitive,
    description: EffectorDescription,
    driver: Arc<dyn BrowserDriver>,
}

impl BrowserEffector {
    fn new(primitive: Primitive, driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            primitive,
            description: primitive.describe(),
            driver,
        }
    }
}

#[async_trait]
impl Effector for BrowserEffector {
    fn description(&self) -> &EffectorDescription {
        &self.description
    }

    async fn invoke(&self, args: Value) -> EffectorResult {
        let message = match self.primitive {
            Primitive::Navigate => {
                let UrlArgs { url } = parse(args)?;
                self.driver.navigate(&url).await?;
                format!("Successfully navigated to {url}")
            }
            Primitive::Click => {
                let IndexArgs { index } = parse(args)?;
                match self.driver.click(index).await? {
                    outcome @ ClickOutcome::NoVisibleChange => {
                        format!("Clicked element {index} - {outcome}")
                    }
                    outcome => format!("Clicked element {index} → {outcome}"),
                }
            }
            Primitive::Input => {
                let InputArgs { index, text } = parse(args)?;
                self.driver.input_text(index, &text).await?;
                format!("Typed '{text}' into element {index}")
            }
            Primitive::SendKeys => {
                let KeysArgs { keys } = parse(args)?;
                self.driver.send_keys(&keys).await?;
                format!("Sent keys: {keys}")
            }
            Primitive::Scroll => {
                let ScrollArgs { down, pages } = parse(args)?;
                self.driver.scroll(down, pages).await?;
                let direction = if down { "down" } else { "up" };
                format!("Scrolled {direction} {pages} pages")
            }
            Primitive::SearchDirect => {
                let SearchArgs { site, query } = parse(args)?;
                let url = search_url(site, &query);
                self.driver.navigate(&url).await?;
                format!("Searched {site} for '{query}' at {url}")
            }
            Primitive::Screenshot => {
                let image = self.driver.screenshot().await?;
                let mut output =
                    EffectorOutput::text(format!("Screenshot captured (size: {} chars)", image.len()));
                output
                    .metadata
                    .insert("screenshot".to_string(), Value::String(image));
                return Ok(output);
            }
        };
        debug!(action = self.description.name.as_str(), %message, "browser primitive done");
        Ok(EffectorOutput::text(message))
    }
}

/// Answers a query over the current page with a separate model call.
pub struct ExtractEffector {
    description: EffectorDescription,
    driver: Arc<dyn BrowserDriver>,
    model: Arc<dyn LanguageModelClient>,
}

impl ExtractEffector {
    pub fn new(driver: Arc<dyn BrowserDriver>, model: Arc<dyn LanguageModelClient>) -> Self {
        Self {
            description: EffectorDescription::new(
                EXTRACT,
                "Extract specific information from the page",
                vec![ParamSpec::new("query", ParamKind::String, "What to extract")],
            ),
            driver,
            model,
        }
    }
}

#[async_trait]
impl Effector for ExtractEffector {
    fn description(&self) -> &EffectorDescription {
        &self.description
    }

    async fn invoke(&self, args: Value) -> EffectorResult {
        let ExtractArgs { query } = parse(args)?;
        let content = truncate_content(self.driver.page_content().await?);
        let request = ModelRequest {
            system_prompt: EXTRACT_SYSTEM_PROMPT.to_string(),
            context: format!(
                "Extract the following information from the page content:\n\nQuery: {query}\n\nPage content:\n{content}\n\nProvide a concise answer based only on the page content. If the information is not available, say so."
            ),
            screenshot: None,
            options: ModelOptions::default(),
        };
        let response = self
            .model
            .complete(&request)
            .await
            .map_err(|e| EffectorError::Failed(format!("extraction model failed: {e:#}")))?;
        Ok(EffectorOutput::text(format!("Extracted: {}", response.text.trim())))
    }
}

/// The eight browser effectors in vocabulary order. `model` backs `extract`.
pub fn browser_effectors(
    driver: Arc<dyn BrowserDriver>,
    model: Arc<dyn LanguageModelClient>,
) -> Vec<Arc<dyn Effector>> {
    let mut effectors: Vec<Arc<dyn Effector>> = Primitive::ALL
        .into_iter()
        .map(|primitive| {
            Arc::new(BrowserEffector::new(primitive, driver.clone())) as Arc<dyn Effector>
        })
        .collect();
    effectors.push(Arc::new(ExtractEffector::new(driver, model)));
    effectors
}
