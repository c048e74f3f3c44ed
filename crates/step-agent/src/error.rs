use thiserror::Error;

/// Conditions that end a run or reject a step before it starts.
///
/// Malformed model output and failing effectors never show up here: both are
/// folded into the step history and the loop continues.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("language model request failed: {0:#}")]
    Model(anyhow::Error),
    #[error("failed to observe the environment: {0:#}")]
    Perception(anyhow::Error),
    #[error("effector `{name}` is unavailable: {message}")]
    Effector { name: String, message: String },
    #[error("step budget of {max_steps} exhausted")]
    BudgetExhausted { max_steps: usize },
    #[error("run already terminated")]
    AlreadyTerminated,
}

impl ControllerError {
    /// True for failures of the model, the perception source or an effector
    /// backend.
    pub fn is_external_service(&self) -> bool {
        matches!(
            self,
            Self::Model(_) | Self::Perception(_) | Self::Effector { .. }
        )
    }
}
