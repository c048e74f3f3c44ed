//! In-memory browser used by the demos and tests.
//!
//! Pages are registered up front by URL. The simulation keeps the properties
//! the decision loop depends on: a viewport that only exposes part of a long
//! element list, indexes that are renumbered on every `observe`, and an
//! ordered log of the primitives that were executed.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use step_agent::{InteractiveElement, Perception};
use tokio::sync::Mutex;

use crate::driver::{BrowserDriver, ClickOutcome, DriverError};

const DEFAULT_VIEWPORT: usize = 20;
const BLANK_URL: &str = "about:blank";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementKind {
    Link { href: String },
    /// Clicking appends `reveals` (if any) to the page text.
    Button { reveals: Option<String> },
    /// Pressing Enter while focused navigates to `action` followed by the
    /// URL-encoded value.
    SearchInput { action: String },
    TextInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimElement {
    pub description: String,
    pub kind: ElementKind,
}

impl SimElement {
    pub fn link(description: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind: ElementKind::Link { href: href.into() },
        }
    }

    pub fn button(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind: ElementKind::Button { reveals: None },
        }
    }

    pub fn button_revealing(description: impl Into<String>, reveals: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind: ElementKind::Button {
                reveals: Some(reveals.into()),
            },
        }
    }

    pub fn search_box(description: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind: ElementKind::SearchInput {
                action: action.into(),
            },
        }
    }

    pub fn text_input(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind: ElementKind::TextInput,
        }
    }

    fn tag(&self) -> String {
        match &self.kind {
            ElementKind::Link { href } => format!("a href='{href}'"),
            ElementKind::Button { .. } => "button".to_string(),
            ElementKind::SearchInput { .. } => "input type='search'".to_string(),
            ElementKind::TextInput => "input type='text'".to_string(),
        }
    }

    fn is_input(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::SearchInput { .. } | ElementKind::TextInput
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimPage {
    pub title: String,
    pub text: String,
    pub elements: Vec<SimElement>,
}

impl SimPage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_element(mut self, element: SimElement) -> Self {
        self.elements.push(element);
        self
    }

    fn not_found(url: &str) -> Self {
        Self::new("404 Not Found").with_text(format!("The page {url} could not be found."))
    }
}

/// Primitive recorded in the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BrowserCommand {
    Navigate { url: String },
    Click { index: usize },
    Input { index: usize, text: String },
    SendKeys { keys: String },
    Scroll { down: bool, pages: f64 },
    Screenshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEvent {
    pub sequence: u64,
    pub command: BrowserCommand,
}

#[derive(Debug)]
struct SimState {
    pages: HashMap<String, SimPage>,
    url: String,
    page: SimPage,
    scroll_offset: usize,
    /// Maps indexes of the last observed element list to page positions.
    cache: Vec<usize>,
    values: HashMap<usize, String>,
    focused: Option<usize>,
    events: Vec<BrowserEvent>,
    next_sequence: u64,
    closed: bool,
}

impl SimState {
    fn record(&mut self, command: BrowserCommand) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);
        self.events.push(BrowserEvent { sequence, command });
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Unreachable("browser session closed".into()));
        }
        Ok(())
    }

    fn load(&mut self, url: &str) -> Result<(), DriverError> {
        let url = url.trim();
        let valid = url.starts_with("http://") || url.starts_with("https://") || url == BLANK_URL;
        if !valid {
            return Err(DriverError::Navigation(format!("invalid url {url:?}")));
        }
        self.page = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| SimPage::not_found(url));
        self.url = url.to_string();
        self.scroll_offset = 0;
        self.cache.clear();
        self.values.clear();
        self.focused = None;
        Ok(())
    }

    fn resolve(&self, index: usize) -> Result<usize, DriverError> {
        self.cache
            .get(index)
            .copied()
            .ok_or(DriverError::ElementNotFound { index })
    }

    fn render(&self) -> String {
        let mut out = format!("{}\n{}\n", self.page.title, self.page.text);
        for (position, element) in self.page.elements.iter().enumerate() {
            out.push_str(&element.description);
            if let Some(value) = self.values.get(&position) {
                out.push_str(&format!(" [{value}]"));
            }
            out.push('\n');
        }
        out
    }
}

pub struct SimulatedBrowser {
    state: Mutex<SimState>,
    viewport: usize,
    screenshots: bool,
}

impl SimulatedBrowser {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState {
                pages: HashMap::new(),
                url: BLANK_URL.to_string(),
                page: SimPage::new(""),
                scroll_offset: 0,
                cache: Vec::new(),
                values: HashMap::new(),
                focused: None,
                events: Vec::new(),
                next_sequence: 0,
                closed: false,
            }),
            viewport: DEFAULT_VIEWPORT,
            screenshots: false,
        }
    }

    /// Number of elements exposed per observation.
    pub fn with_viewport(mut self, elements: usize) -> Self {
        self.viewport = elements.max(1);
        self
    }

    /// Attach a screenshot to every observation.
    pub fn with_screenshots(mut self, enabled: bool) -> Self {
        self.screenshots = enabled;
        self
    }

    pub fn with_page(mut self, url: impl Into<String>, page: SimPage) -> Self {
        self.state.get_mut().pages.insert(url.into(), page);
        self
    }

    pub async fn add_page(&self, url: impl Into<String>, page: SimPage) {
        self.state.lock().await.pages.insert(url.into(), page);
    }

    pub async fn current_url(&self) -> String {
        self.state.lock().await.url.clone()
    }

    pub async fn events(&self) -> Vec<BrowserEvent> {
        self.state.lock().await.events.clone()
    }

    /// Value typed into the element at page position `position`.
    pub async fn input_value(&self, position: usize) -> Option<String> {
        self.state.lock().await.values.get(&position).cloned()
    }

    /// Simulates the browser process going away.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
    }
}

impl Default for SimulatedBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for SimulatedBrowser {
    async fn observe(&self) -> Result<Perception, DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;

        let end = (state.scroll_offset + self.viewport).min(state.page.elements.len());
        let visible: Vec<usize> = (state.scroll_offset..end).collect();
        let elements = visible
            .iter()
            .enumerate()
            .map(|(index, &position)| {
                let element = &state.page.elements[position];
                let description = match state.values.get(&position) {
                    Some(value) => format!("{} value='{value}'", element.description),
                    None => element.description.clone(),
                };
                InteractiveElement::new(index, element.tag(), description)
            })
            .collect();
        state.cache = visible;

        let text = (!state.page.text.is_empty()).then(|| state.page.text.clone());
        let screenshot = self.screenshots.then(|| STANDARD.encode(state.render()));
        Ok(Perception {
            url: Some(state.url.clone()),
            title: Some(state.page.title.clone()),
            elements,
            screenshot,
            text,
        })
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        state.load(url)?;
        state.record(BrowserCommand::Navigate {
            url: url.trim().to_string(),
        });
        Ok(())
    }

    async fn click(&self, index: usize) -> Result<ClickOutcome, DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let position = state.resolve(index)?;
        state.record(BrowserCommand::Click { index });

        let kind = state.page.elements[position].kind.clone();
        match kind {
            ElementKind::Link { href } => {
                state.load(&href)?;
                Ok(ClickOutcome::Navigated { url: href })
            }
            ElementKind::Button {
                reveals: Some(text),
            } => {
                if !state.page.text.is_empty() {
                    state.page.text.push('\n');
                }
                state.page.text.push_str(&text);
                Ok(ClickOutcome::ContentChanged)
            }
            ElementKind::Button { reveals: None } => Ok(ClickOutcome::NoVisibleChange),
            ElementKind::SearchInput { .. } | ElementKind::TextInput => {
                state.focused = Some(position);
                Ok(ClickOutcome::NoVisibleChange)
            }
        }
    }

    async fn input_text(&self, index: usize, text: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let position = state.resolve(index)?;
        if !state.page.elements[position].is_input() {
            return Err(DriverError::NotEditable { index });
        }
        state.values.insert(position, text.to_string());
        state.focused = Some(position);
        state.record(BrowserCommand::Input {
            index,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn send_keys(&self, keys: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        state.record(BrowserCommand::SendKeys {
            keys: keys.to_string(),
        });

        if keys != "Enter" {
            return Ok(());
        }
        let Some(position) = state.focused else {
            return Ok(());
        };
        if let ElementKind::SearchInput { action } = &state.page.elements[position].kind {
            let query = state.values.get(&position).cloned().unwrap_or_default();
            let target = format!("{action}{}", urlencoding::encode(&query));
            state.load(&target)?;
        }
        Ok(())
    }

    async fn scroll(&self, down: bool, pages: f64) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        let max_offset = state.page.elements.len().saturating_sub(self.viewport);
        // Float-to-int casts saturate; anything past the page end is clamped below.
        let step = ((pages.abs() * self.viewport as f64).round() as usize).max(1);
        state.scroll_offset = if down {
            state.scroll_offset.saturating_add(step).min(max_offset)
        } else {
            state.scroll_offset.saturating_sub(step)
        };
        state.record(BrowserCommand::Scroll { down, pages });
        Ok(())
    }

    async fn screenshot(&self) -> Result<String, DriverError> {
        let mut state = self.state.lock().await;
        state.ensure_open()?;
        state.record(BrowserCommand::Screenshot);
        Ok(STANDARD.encode(state.render()))
    }

    async fn page_content(&self) -> Result<String, DriverError> {
        let state = self.state.lock().await;
        state.ensure_open()?;
        Ok(state.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "https://shop.test/";
    const SEARCH: &str = "https://shop.test/search?q=";

    fn shop() -> SimulatedBrowser {
        SimulatedBrowser::new()
            .with_viewport(3)
            .with_page(
                HOME,
                SimPage::new("Shop")
                    .with_element(SimElement::search_box("Search the shop", SEARCH))
                    .with_element(SimElement::button("Sign In"))
                    .with_element(SimElement::link("Milk", "https://shop.test/milk"))
                    .with_element(SimElement::link("Bread", "https://shop.test/bread"))
                    .with_element(SimElement::link("Eggs", "https://shop.test/eggs")),
            )
            .with_page(
                "https://shop.test/milk",
                SimPage::new("Milk")
                    .with_text("Organic milk, 2 gallons")
                    .with_element(SimElement::button_revealing("Show price", "Price: $12.99")),
            )
            .with_page(
                "https://shop.test/search?q=organic%20milk",
                SimPage::new("Results").with_element(SimElement::link("Organic milk", "https://shop.test/milk")),
            )
    }

    #[tokio::test]
    async fn indexes_are_renumbered_after_scrolling() {
        let browser = shop();
        browser.navigate(HOME).await.unwrap();
        let first = browser.observe().await.unwrap();
        assert_eq!(first.elements.len(), 3);
        assert_eq!(first.elements[2].description, "Milk");

        browser.scroll(true, 1.0).await.unwrap();
        let second = browser.observe().await.unwrap();
        assert_eq!(second.elements[0].index, 0);
        assert_eq!(second.elements[0].description, "Milk");
        assert_eq!(second.elements[1].description, "Bread");

        let outcome = browser.click(1).await.unwrap();
        assert_eq!(
            outcome,
            ClickOutcome::Navigated {
                url: "https://shop.test/bread".into()
            }
        );
        assert_eq!(browser.observe().await.unwrap().title.as_deref(), Some("404 Not Found"));
    }

    #[tokio::test]
    async fn huge_scroll_clamps_to_the_page_end() {
        let mut page = SimPage::new("Long list");
        for n in 0..10 {
            page = page.with_element(SimElement::button(format!("Item {n}")));
        }
        let browser = SimulatedBrowser::new()
            .with_viewport(3)
            .with_page("https://shop.test/long", page);
        browser.navigate("https://shop.test/long").await.unwrap();

        browser.scroll(true, 1.0).await.unwrap();
        browser.scroll(true, 1e300).await.unwrap();
        let bottom = browser.observe().await.unwrap();
        let names: Vec<_> = bottom.elements.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(names, ["Item 7", "Item 8", "Item 9"]);

        browser.scroll(false, 1e300).await.unwrap();
        let top = browser.observe().await.unwrap();
        assert_eq!(top.elements[0].description, "Item 0");
    }

    #[tokio::test]
    async fn pages_added_later_are_reachable() {
        let browser = shop();
        browser
            .add_page("https://shop.test/eggs", SimPage::new("Eggs").with_text("A dozen eggs"))
            .await;
        browser.navigate("https://shop.test/eggs").await.unwrap();
        assert_eq!(browser.observe().await.unwrap().title.as_deref(), Some("Eggs"));
    }

    #[tokio::test]
    async fn stale_indexes_fail_after_navigation() {
        let browser = shop();
        browser.navigate(HOME).await.unwrap();
        browser.observe().await.unwrap();
        browser.click(2).await.unwrap();
        let err = browser.click(0).await.unwrap_err();
        assert!(matches!(err, DriverError::ElementNotFound { index: 0 }));
    }

    #[tokio::test]
    async fn typing_and_enter_submits_search() {
        let browser = shop();
        browser.navigate(HOME).await.unwrap();
        browser.observe().await.unwrap();
        browser.input_text(0, "organic milk").await.unwrap();
        assert_eq!(browser.input_value(0).await.as_deref(), Some("organic milk"));
        browser.send_keys("Enter").await.unwrap();
        assert_eq!(
            browser.current_url().await,
            "https://shop.test/search?q=organic%20milk"
        );
        let results = browser.observe().await.unwrap();
        assert_eq!(results.elements[0].description, "Organic milk");
    }

    #[tokio::test]
    async fn typing_into_a_button_fails() {
        let browser = shop();
        browser.navigate(HOME).await.unwrap();
        browser.observe().await.unwrap();
        let err = browser.input_text(1, "hello").await.unwrap_err();
        assert!(matches!(err, DriverError::NotEditable { index: 1 }));
    }

    #[tokio::test]
    async fn revealing_button_changes_content() {
        let browser = shop();
        browser.navigate("https://shop.test/milk").await.unwrap();
        browser.observe().await.unwrap();
        assert_eq!(browser.click(0).await.unwrap(), ClickOutcome::ContentChanged);
        assert!(browser.page_content().await.unwrap().contains("Price: $12.99"));
    }

    #[tokio::test]
    async fn events_are_sequenced() {
        let browser = shop();
        browser.navigate(HOME).await.unwrap();
        browser.observe().await.unwrap();
        browser.scroll(true, 0.5).await.unwrap();
        browser.screenshot().await.unwrap();
        let events = browser.events().await;
        assert_eq!(events.len(), 3);
        assert!(events.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
        assert!(matches!(events[1].command, BrowserCommand::Scroll { down: true, .. }));
    }

    #[tokio::test]
    async fn closed_browser_is_unreachable() {
        let browser = shop();
        browser.close().await;
        assert!(matches!(
            browser.observe().await,
            Err(DriverError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn rejects_relative_urls() {
        let browser = shop();
        assert!(matches!(
            browser.navigate("shop.test").await,
            Err(DriverError::Navigation(_))
        ));
    }

    #[tokio::test]
    async fn screenshots_are_optional() {
        let plain = shop();
        plain.navigate(HOME).await.unwrap();
        assert!(plain.observe().await.unwrap().screenshot.is_none());

        let visual = shop().with_screenshots(true);
        visual.navigate(HOME).await.unwrap();
        let shot = visual.observe().await.unwrap().screenshot.unwrap();
        let decoded = String::from_utf8(STANDARD.decode(shot).unwrap()).unwrap();
        assert!(decoded.starts_with("Shop\n"));
    }
}
