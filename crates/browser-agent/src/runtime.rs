use std::sync::Arc;

use async_trait::async_trait;
use step_agent::{
    ControllerConfig, ControllerError, Effector, EffectorDescription, LanguageModelClient,
    Perception, PerceptionSource, RunOutcome, StepController,
};
use tracing::info;

use crate::driver::BrowserDriver;
use crate::prompt::browser_system_prompt;
use crate::tools::browser_effectors;

/// Perception source that observes the browser before every step.
pub struct DriverPerception {
    driver: Arc<dyn BrowserDriver>,
}

impl DriverPerception {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl PerceptionSource for DriverPerception {
    async fn perceive(&self) -> anyhow::Result<Perception> {
        Ok(self.driver.observe().await?)
    }
}

pub struct BrowserAgent {
    controller: StepController,
    perception: DriverPerception,
}

impl BrowserAgent {
    pub fn builder(
        model: Arc<dyn LanguageModelClient>,
        driver: Arc<dyn BrowserDriver>,
    ) -> BrowserAgentBuilder {
        BrowserAgentBuilder::new(model, driver)
    }

    pub async fn run(&self, task: &str) -> Result<RunOutcome, ControllerError> {
        let outcome = self.controller.run(task, &self.perception).await?;
        info!(
            steps = outcome.history().len(),
            success = outcome.is_success(),
            "browser task finished"
        );
        Ok(outcome)
    }

    pub fn controller(&self) -> &StepController {
        &self.controller
    }

    pub fn tool_descriptions(&self) -> Vec<EffectorDescription> {
        self.controller.effectors().descriptions()
    }
}

pub struct BrowserAgentBuilder {
    model: Arc<dyn LanguageModelClient>,
    driver: Arc<dyn BrowserDriver>,
    extract_model: Option<Arc<dyn LanguageModelClient>>,
    config: ControllerConfig,
    tools: Vec<Arc<dyn Effector>>,
}

impl BrowserAgentBuilder {
    fn new(model: Arc<dyn LanguageModelClient>, driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            model,
            driver,
            extract_model: None,
            config: ControllerConfig::default(),
            tools: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Model used by `extract`. Defaults to the decision model.
    pub fn with_extract_model(mut self, model: Arc<dyn LanguageModelClient>) -> Self {
        self.extract_model = Some(model);
        self
    }

    /// Registers a non-browser tool next to the browser primitives.
    pub fn register_tool(mut self, tool: Arc<dyn Effector>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn build(self) -> BrowserAgent {
        let mut config = self.config;
        if config.system_prompt.is_none() {
            let extra: Vec<EffectorDescription> = self
                .tools
                .iter()
                .map(|tool| tool.description().clone())
                .collect();
            config.system_prompt = Some(browser_system_prompt(&extra));
        }

        let extract_model = self.extract_model.unwrap_or_else(|| self.model.clone());
        let controller = StepController::new(self.model, config)
            .with_effectors(browser_effectors(self.driver.clone(), extract_model))
            .with_effectors(self.tools);

        BrowserAgent {
            controller,
            perception: DriverPerception::new(self.driver),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use step_agent::{ScriptedModel, StepResult, DEFAULT_MAX_STEPS};

    use super::*;
    use crate::prompt::BROWSER_SYSTEM_PROMPT;
    use crate::simulated::{SimElement, SimPage, SimulatedBrowser};

    fn browser() -> Arc<SimulatedBrowser> {
        Arc::new(
            SimulatedBrowser::new().with_page(
                "https://shop.test/",
                SimPage::new("Shop").with_element(SimElement::button("Sign In")),
            ),
        )
    }

    #[test]
    fn defaults_to_browser_prompt_and_budget() {
        let agent = BrowserAgent::builder(Arc::new(ScriptedModel::default()), browser()).build();
        assert_eq!(agent.controller().system_prompt(), BROWSER_SYSTEM_PROMPT);
        assert_eq!(agent.controller().config().max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(agent.tool_descriptions().len(), 8);
    }

    #[test]
    fn explicit_prompt_is_kept() {
        let agent = BrowserAgent::builder(Arc::new(ScriptedModel::default()), browser())
            .with_config(ControllerConfig::default().with_system_prompt("custom"))
            .build();
        assert_eq!(agent.controller().system_prompt(), "custom");
    }

    #[tokio::test]
    async fn separate_extract_model_is_used() {
        let decisions = Arc::new(ScriptedModel::from_values(vec![
            json!({ "action": "navigate", "action_params": { "url": "https://shop.test/" } }),
            json!({ "action": "extract", "action_params": { "query": "title" } }),
            json!({ "action": "done", "action_params": { "result": "Shop", "success": true } }),
        ]));
        let extractor = Arc::new(ScriptedModel::new(["The page is titled Shop"]));
        let agent = BrowserAgent::builder(decisions.clone(), browser())
            .with_extract_model(extractor.clone())
            .build();

        let outcome = agent.run("What is the page title?").await.unwrap();
        assert_eq!(
            outcome.history()[1].result(),
            &StepResult::Success {
                content: "Extracted: The page is titled Shop".into()
            }
        );
        assert_eq!(decisions.requests().await.len(), 3);
        assert_eq!(extractor.requests().await.len(), 1);
    }
}
