//! Framework-independent agent decision loop.
//!
//! Each step the [`StepController`] asks a [`LanguageModelClient`] for exactly
//! one JSON [`ActionRequest`], validates it against the registered
//! [`Effector`]s and the current [`Perception`], dispatches it, and folds the
//! result into the run's [`LoopState`]. A run ends when the model emits
//! `done` or the step budget runs out.

pub mod action;
pub mod config;
pub mod controller;
pub mod effector;
pub mod error;
pub mod history;
pub mod language_model;
pub mod perception;
pub mod prompt;
pub mod scripted;

pub use action::{Action, ActionRequest, MalformedAction, SearchSite};
pub use config::{ConfigError, ControllerConfig};
pub use controller::{RunOutcome, StepController, StepOutcome};
pub use effector::{
    Effector, EffectorDescription, EffectorError, EffectorOutput, EffectorRegistry,
    EffectorResult, ParamKind, ParamSpec,
};
pub use error::ControllerError;
pub use history::{LoopState, LoopStatus, StepHistoryEntry, StepResult, Termination};
pub use language_model::{
    LanguageModelClient, LanguageModelResponse, LanguageModelUsage, ModelOptions, ModelRequest,
};
pub use perception::{InteractiveElement, Perception, PerceptionSource, StaticPerception};
pub use scripted::ScriptedModel;

pub const DEFAULT_MAX_STEPS: usize = 30;
pub const DEFAULT_HISTORY_WINDOW: usize = 5;
