use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::action::{Action, ActionRequest};
use crate::config::ControllerConfig;
use crate::effector::{Effector, EffectorError, EffectorRegistry};
use crate::error::ControllerError;
use crate::history::{LoopState, LoopStatus, StepHistoryEntry, StepResult, Termination};
use crate::language_model::{LanguageModelClient, ModelRequest};
use crate::perception::{Perception, PerceptionSource};
use crate::prompt::{render_step_context, render_system_prompt};

/// What a single call to [`StepController::step`] produced.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub entry: StepHistoryEntry,
    pub terminal: bool,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed {
        result: String,
        success: bool,
        history: Vec<StepHistoryEntry>,
    },
    BudgetExhausted {
        history: Vec<StepHistoryEntry>,
        memory: String,
    },
}

impl RunOutcome {
    pub fn history(&self) -> &[StepHistoryEntry] {
        match self {
            Self::Completed { history, .. } | Self::BudgetExhausted { history, .. } => history,
        }
    }

    /// The `done` payload, absent when the budget ran out.
    pub fn final_answer(&self) -> Option<(&str, bool)> {
        match self {
            Self::Completed {
                result, success, ..
            } => Some((result.as_str(), *success)),
            Self::BudgetExhausted { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { success: true, .. })
    }
}

/// Drives the model → validate → dispatch → fold loop.
///
/// The controller itself is immutable during a run; all per-run data lives
/// in the [`LoopState`] passed to [`step`](Self::step), so one controller can
/// serve several concurrent runs.
pub struct StepController {
    model: Arc<dyn LanguageModelClient>,
    effectors: EffectorRegistry,
    config: ControllerConfig,
}

impl StepController {
    pub fn new(model: Arc<dyn LanguageModelClient>, config: ControllerConfig) -> Self {
        Self {
            model,
            effectors: EffectorRegistry::new(),
            config,
        }
    }

    pub fn register_effector(&mut self, effector: Arc<dyn Effector>) {
        self.effectors.register(effector);
    }

    pub fn with_effectors<I>(mut self, effectors: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Effector>>,
    {
        for effector in effectors {
            self.register_effector(effector);
        }
        self
    }

    pub fn effectors(&self) -> &EffectorRegistry {
        &self.effectors
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn system_prompt(&self) -> String {
        match &self.config.system_prompt {
            Some(prompt) => prompt.clone(),
            None => render_system_prompt(&self.effectors),
        }
    }

    /// Fresh loop state for `task` with this controller's step budget.
    pub fn start(&self, task: impl Into<String>) -> LoopState {
        LoopState::new(task, self.config.max_steps)
    }

    /// Runs one step against `perception`, which must be the perception the
    /// model is deciding on; element indexes are validated against it.
    pub async fn step(
        &self,
        state: &mut LoopState,
        perception: &Perception,
    ) -> Result<StepOutcome, ControllerError> {
        match state.status() {
            LoopStatus::Running => {}
            LoopStatus::Done(Termination::BudgetExhausted) => {
                return Err(ControllerError::BudgetExhausted {
                    max_steps: state.max_steps(),
                })
            }
            LoopStatus::Done(Termination::Completed { .. }) => {
                return Err(ControllerError::AlreadyTerminated)
            }
        }
        if state.step() >= state.max_steps() {
            state.exhaust();
            return Err(ControllerError::BudgetExhausted {
                max_steps: state.max_steps(),
            });
        }

        let step_number = state.step() + 1;
        info!(
            step = step_number,
            max_steps = state.max_steps(),
            elements = perception.elements.len(),
            "deciding next action"
        );

        let request = ModelRequest {
            system_prompt: self.system_prompt(),
            context: render_step_context(
                state,
                perception,
                self.config.history_window,
                self.repeat_notice(state).as_deref(),
            ),
            screenshot: perception.screenshot.clone(),
            options: self.config.model_options.clone(),
        };
        let response = self
            .model
            .complete(&request)
            .await
            .map_err(ControllerError::Model)?;
        debug!(step = step_number, raw = %response.text, "model response");

        let entry = match ActionRequest::parse(&response.text, &self.effectors, perception) {
            Err(err) => {
                warn!(step = step_number, error = %err, "malformed action");
                StepHistoryEntry::new(
                    step_number,
                    None,
                    StepResult::MalformedAction {
                        message: err.to_string(),
                    },
                )
            }
            Ok(request) => {
                info!(
                    step = step_number,
                    action = request.action.name(),
                    params = %request.action.params(),
                    "decision"
                );
                let result = self.dispatch(&request.action).await?;
                StepHistoryEntry::new(step_number, Some(request), result)
            }
        };

        state.record(entry.clone());
        let terminal = !state.is_running();
        if let LoopStatus::Done(Termination::BudgetExhausted) = state.status() {
            warn!(
                max_steps = state.max_steps(),
                "step budget exhausted without a done action"
            );
        }
        Ok(StepOutcome { entry, terminal })
    }

    async fn dispatch(&self, action: &Action) -> Result<StepResult, ControllerError> {
        if let Action::Done { result, success } = action {
            info!(success, result = %result, "task marked done");
            return Ok(StepResult::Done {
                result: result.clone(),
                success: *success,
            });
        }

        let name = action.name();
        let Some(effector) = self.effectors.get(name) else {
            // parse() only accepts registered names, but the registry is the
            // source of truth at dispatch time.
            return Ok(StepResult::MalformedAction {
                message: format!("unknown action `{name}`"),
            });
        };

        match effector.invoke(action.params()).await {
            Ok(output) => {
                let content = output.summary();
                debug!(action = name, result = %content, "effector result");
                Ok(StepResult::Success { content })
            }
            Err(EffectorError::Unavailable(message)) => Err(ControllerError::Effector {
                name: name.to_string(),
                message,
            }),
            Err(err) => {
                warn!(action = name, error = %err, "effector failed");
                Ok(StepResult::EffectorFailure {
                    message: err.to_string(),
                })
            }
        }
    }

    fn repeat_notice(&self, state: &LoopState) -> Option<String> {
        let threshold = self.config.repeat_notice_after?;
        let repeats = state.repeated_tail();
        (threshold > 0 && repeats >= threshold).then(|| {
            format!(
                "your last {repeats} actions were identical; if you are stuck in a loop, try a different element index or action"
            )
        })
    }

    /// Runs `task` to completion, taking a fresh perception before each step.
    pub async fn run(
        &self,
        task: impl Into<String>,
        source: &dyn PerceptionSource,
    ) -> Result<RunOutcome, ControllerError> {
        let mut state = self.start(task);
        info!(task = state.task(), max_steps = state.max_steps(), "starting run");

        while state.is_running() {
            let perception = source
                .perceive()
                .await
                .map_err(ControllerError::Perception)?;
            self.step(&mut state, &perception).await?;
        }

        let termination = match state.status() {
            LoopStatus::Done(termination) => termination.clone(),
            LoopStatus::Running => Termination::BudgetExhausted,
        };
        let steps = state.step();
        let (history, memory) = state.into_parts();
        Ok(match termination {
            Termination::Completed { result, success } => {
                info!(steps, success, "run completed");
                RunOutcome::Completed {
                    result,
                    success,
                    history,
                }
            }
            Termination::BudgetExhausted => {
                warn!(steps, "run ended without a done action");
                RunOutcome::BudgetExhausted { history, memory }
            }
        })
    }
}
