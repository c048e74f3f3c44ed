//! Browser automation on top of the step controller.
//!
//! A [`BrowserDriver`] exposes the browser primitives; [`browser_effectors`]
//! wraps each primitive as an effector, and [`BrowserAgent`] wires them into a
//! [`step_agent::StepController`] that observes the page before every step.

pub mod driver;
pub mod prompt;
pub mod runtime;
pub mod simulated;
pub mod tools;

pub use driver::{BrowserDriver, ClickOutcome, DriverError};
pub use prompt::{browser_system_prompt, BROWSER_SYSTEM_PROMPT};
pub use runtime::{BrowserAgent, BrowserAgentBuilder, DriverPerception};
pub use simulated::{BrowserCommand, BrowserEvent, ElementKind, SimElement, SimPage, SimulatedBrowser};
pub use tools::{browser_effectors, search_url, BrowserEffector, ExtractEffector, EXTRACT_CONTENT_LIMIT};
