//! Demo tools for the step controller: arithmetic plus mocked search, time
//! and weather lookups.

pub mod calculator;
pub mod search;

use std::sync::Arc;

use step_agent::Effector;

pub use calculator::{calculator_tools, CalculatorError, CalculatorTool, Operation};
pub use search::{search_tools, CurrentTimeTool, SearchWebTool, WeatherTool};

/// Every demo tool, calculator first.
pub fn all_tools() -> Vec<Arc<dyn Effector>> {
    let mut tools = calculator_tools();
    tools.extend(search_tools());
    tools
}
