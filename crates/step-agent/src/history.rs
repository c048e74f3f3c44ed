use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::action::{Action, ActionRequest};

/// Outcome of one step as it is folded into history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Success { content: String },
    MalformedAction { message: String },
    EffectorFailure { message: String },
    Done { result: String, success: bool },
}

impl StepResult {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedAction { .. } | Self::EffectorFailure { .. }
        )
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { content } => f.write_str(content),
            Self::MalformedAction { message } => write!(f, "Invalid action: {message}"),
            Self::EffectorFailure { message } => write!(f, "Action failed: {message}"),
            Self::Done { result, success } => {
                write!(f, "Task complete (success={success}): {result}")
            }
        }
    }
}

/// Immutable record of one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepHistoryEntry {
    step: usize,
    request: Option<ActionRequest>,
    result: StepResult,
}

impl StepHistoryEntry {
    pub fn new(step: usize, request: Option<ActionRequest>, result: StepResult) -> Self {
        Self {
            step,
            request,
            result,
        }
    }

    /// One-based step number.
    pub fn step(&self) -> usize {
        self.step
    }

    /// `None` when the model output failed validation.
    pub fn request(&self) -> Option<&ActionRequest> {
        self.request.as_ref()
    }

    pub fn action(&self) -> Option<&Action> {
        self.request.as_ref().map(|request| &request.action)
    }

    pub fn result(&self) -> &StepResult {
        &self.result
    }

    pub fn to_value(&self) -> Value {
        json!({
            "step": self.step,
            "request": self.request.as_ref().map(ActionRequest::to_value),
            "result": self.result,
        })
    }

    fn render(&self) -> String {
        let goal = self
            .request
            .as_ref()
            .map(|request| request.next_goal.as_str())
            .filter(|goal| !goal.is_empty())
            .unwrap_or("Unknown");
        let action = match self.action() {
            Some(action) => format!("{}({})", action.name(), action.params()),
            None => "(invalid output)".to_string(),
        };
        format!(
            "<step_{n}>\nGoal: {goal}\nAction: {action}\nResult: {result}\n</step_{n}>",
            n = self.step,
            result = self.result
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    Completed { result: String, success: bool },
    BudgetExhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopStatus {
    Running,
    Done(Termination),
}

/// Per-run state owned by a single run of the step controller.
#[derive(Debug, Clone)]
pub struct LoopState {
    task: String,
    step: usize,
    max_steps: usize,
    history: Vec<StepHistoryEntry>,
    memory: String,
    status: LoopStatus,
}

impl LoopState {
    pub fn new(task: impl Into<String>, max_steps: usize) -> Self {
        let mut state = Self {
            task: task.into(),
            step: 0,
            max_steps,
            history: Vec::new(),
            memory: String::new(),
            status: LoopStatus::Running,
        };
        if max_steps == 0 {
            state.status = LoopStatus::Done(Termination::BudgetExhausted);
        }
        state
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// Number of steps taken so far.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn history(&self) -> &[StepHistoryEntry] {
        &self.history
    }

    pub fn memory(&self) -> &str {
        &self.memory
    }

    pub fn status(&self) -> &LoopStatus {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == LoopStatus::Running
    }

    pub fn into_parts(self) -> (Vec<StepHistoryEntry>, String) {
        (self.history, self.memory)
    }

    /// Appends `entry` and advances the step counter. An explicit `done` takes
    /// precedence over budget exhaustion on the final step.
    pub(crate) fn record(&mut self, entry: StepHistoryEntry) {
        if let Some(request) = entry.request() {
            if !request.memory.trim().is_empty() {
                self.memory = request.memory.clone();
            }
        }
        let termination = match entry.result() {
            StepResult::Done { result, success } => Some(Termination::Completed {
                result: result.clone(),
                success: *success,
            }),
            _ => None,
        };
        self.history.push(entry);
        self.step += 1;

        if let Some(termination) = termination {
            self.status = LoopStatus::Done(termination);
        } else if self.step >= self.max_steps {
            self.status = LoopStatus::Done(Termination::BudgetExhausted);
        }
    }

    pub(crate) fn exhaust(&mut self) {
        if self.is_running() {
            self.status = LoopStatus::Done(Termination::BudgetExhausted);
        }
    }

    /// Count of trailing entries issuing the same action with the same
    /// parameters. Failed validations break the run.
    pub fn repeated_tail(&self) -> usize {
        let mut iter = self.history.iter().rev().map(StepHistoryEntry::action);
        let Some(Some(last)) = iter.next() else {
            return 0;
        };
        let key = (last.name(), last.params());
        1 + iter
            .take_while(|action| {
                action.is_some_and(|action| (action.name(), action.params()) == key)
            })
            .count()
    }

    /// Renders the last `window` entries for the model.
    ///
    /// A `window` of 0 renders no entries at all; the model only learns how
    /// many steps were taken.
    pub fn format_history(&self, window: usize) -> String {
        if self.history.is_empty() {
            return "No previous actions yet".to_string();
        }
        if window == 0 {
            return format!("{} previous steps not shown", self.history.len());
        }
        let start = self.history.len().saturating_sub(window);
        self.history[start..]
            .iter()
            .map(StepHistoryEntry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scroll_entry(step: usize) -> StepHistoryEntry {
        StepHistoryEntry::new(
            step,
            Some(ActionRequest::new(Action::Scroll {
                down: true,
                pages: 1.0,
            })),
            StepResult::Success {
                content: "Scrolled down 1 pages".into(),
            },
        )
    }

    #[test]
    fn record_advances_and_exhausts_budget() {
        let mut state = LoopState::new("task", 2);
        state.record(scroll_entry(1));
        assert!(state.is_running());
        state.record(scroll_entry(2));
        assert_eq!(state.step(), 2);
        assert_eq!(
            state.status(),
            &LoopStatus::Done(Termination::BudgetExhausted)
        );
    }

    #[test]
    fn done_on_last_step_counts_as_completed() {
        let mut state = LoopState::new("task", 1);
        state.record(StepHistoryEntry::new(
            1,
            Some(ActionRequest::new(Action::Done {
                result: "ok".into(),
                success: true,
            })),
            StepResult::Done {
                result: "ok".into(),
                success: true,
            },
        ));
        assert_eq!(
            state.status(),
            &LoopStatus::Done(Termination::Completed {
                result: "ok".into(),
                success: true
            })
        );
    }

    #[test]
    fn memory_only_replaced_when_non_empty() {
        let mut state = LoopState::new("task", 5);
        let mut request = ActionRequest::new(Action::Screenshot);
        request.memory = "on the cart page".into();
        state.record(StepHistoryEntry::new(
            1,
            Some(request),
            StepResult::Success {
                content: "captured".into(),
            },
        ));
        state.record(scroll_entry(2));
        assert_eq!(state.memory(), "on the cart page");
    }

    #[test]
    fn zero_budget_starts_exhausted() {
        assert!(!LoopState::new("task", 0).is_running());
    }

    #[test]
    fn repeated_tail_counts_identical_actions() {
        let mut state = LoopState::new("task", 10);
        assert_eq!(state.repeated_tail(), 0);
        state.record(StepHistoryEntry::new(
            1,
            None,
            StepResult::MalformedAction {
                message: "bad".into(),
            },
        ));
        assert_eq!(state.repeated_tail(), 0);
        state.record(scroll_entry(2));
        state.record(scroll_entry(3));
        state.record(scroll_entry(4));
        assert_eq!(state.repeated_tail(), 3);
    }

    #[test]
    fn history_window_keeps_most_recent() {
        let mut state = LoopState::new("task", 10);
        assert_eq!(state.format_history(5), "No previous actions yet");
        for step in 1..=7 {
            state.record(scroll_entry(step));
        }
        let rendered = state.format_history(5);
        assert!(!rendered.contains("<step_2>"));
        assert!(rendered.contains("<step_3>"));
        assert!(rendered.contains("<step_7>"));
        assert!(rendered.contains("Action: scroll({\"down\":true,\"pages\":1.0})"));
    }

    #[test]
    fn zero_window_renders_no_entries() {
        let mut state = LoopState::new("task", 10);
        assert_eq!(state.format_history(0), "No previous actions yet");
        for step in 1..=3 {
            state.record(scroll_entry(step));
        }
        let rendered = state.format_history(0);
        assert_eq!(rendered, "3 previous steps not shown");
        assert!(!rendered.contains("<step_"));
        assert!(state.format_history(1).contains("<step_3>"));
    }

    #[test]
    fn malformed_entries_render_their_reason() {
        let entry = StepHistoryEntry::new(
            4,
            None,
            StepResult::MalformedAction {
                message: "unknown action `hover`".into(),
            },
        );
        let rendered = entry.render();
        assert!(rendered.contains("Action: (invalid output)"));
        assert!(rendered.contains("Result: Invalid action: unknown action `hover`"));
        assert_eq!(entry.to_value()["result"]["status"], "malformed_action");
    }
}
