use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use step_agent::{
    Effector, EffectorDescription, EffectorError, EffectorOutput, EffectorResult, ParamKind,
    ParamSpec,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Multiply,
    Subtract,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Add,
        Operation::Multiply,
        Operation::Subtract,
        Operation::Divide,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Multiply => "multiply",
            Self::Subtract => "subtract",
            Self::Divide => "divide",
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            Self::Add => "Add two numbers together",
            Self::Multiply => "Multiply two numbers together",
            Self::Subtract => "Subtract b from a",
            Self::Divide => "Divide a by b",
        }
    }

    pub fn apply(&self, a: f64, b: f64) -> Result<f64, CalculatorError> {
        match self {
            Self::Add => Ok(a + b),
            Self::Multiply => Ok(a * b),
            Self::Subtract => Ok(a - b),
            Self::Divide if b == 0.0 => Err(CalculatorError::DivisionByZero),
            Self::Divide => Ok(a / b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculatorError {
    #[error("Cannot divide by zero")]
    DivisionByZero,
}

#[derive(Debug, Deserialize)]
struct Operands {
    a: f64,
    b: f64,
}

pub struct CalculatorTool {
    operation: Operation,
    description: EffectorDescription,
}

impl CalculatorTool {
    pub fn new(operation: Operation) -> Self {
        let (first, second) = match operation {
            Operation::Divide => ("Numerator", "Denominator"),
            _ => ("First number", "Second number"),
        };
        Self {
            operation,
            description: EffectorDescription::new(
                operation.name(),
                operation.summary(),
                vec![
                    ParamSpec::new("a", ParamKind::Number, first),
                    ParamSpec::new("b", ParamKind::Number, second),
                ],
            ),
        }
    }
}

#[async_trait]
impl Effector for CalculatorTool {
    fn description(&self) -> &EffectorDescription {
        &self.description
    }

    async fn invoke(&self, args: Value) -> EffectorResult {
        let Operands { a, b } = serde_json::from_value(args)
            .map_err(|e| EffectorError::InvalidInput(format!("invalid operands: {e}")))?;
        let result = self
            .operation
            .apply(a, b)
            .map_err(|e| EffectorError::Failed(e.to_string()))?;
        debug!(op = self.operation.name(), a, b, result, "calculated");
        Ok(EffectorOutput::new(json!(result)))
    }
}

/// add, multiply, subtract and divide.
pub fn calculator_tools() -> Vec<Arc<dyn Effector>> {
    Operation::ALL
        .into_iter()
        .map(|op| Arc::new(CalculatorTool::new(op)) as Arc<dyn Effector>)
        .collect()
}
