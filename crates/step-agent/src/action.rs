//! The action schema the model must emit every step.
//!
//! Model output is parsed in two passes: the envelope (`thinking`, `memory`,
//! `next_goal`, `action`, `action_params`) first, then `action_params` against
//! the contract of the named action. Browser primitives and `done` have typed
//! parameter structs; any other registered effector is checked against its
//! declared [`ParamSpec`](crate::effector::ParamSpec) list.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::effector::EffectorRegistry;
use crate::perception::Perception;

pub const NAVIGATE: &str = "navigate";
pub const CLICK: &str = "click";
pub const INPUT: &str = "input";
pub const SEND_KEYS: &str = "send_keys";
pub const SCROLL: &str = "scroll";
pub const SEARCH_DIRECT: &str = "search_direct";
pub const SCREENSHOT: &str = "screenshot";
pub const EXTRACT: &str = "extract";
pub const DONE: &str = "done";

pub const BROWSER_ACTIONS: [&str; 8] = [
    NAVIGATE,
    CLICK,
    INPUT,
    SEND_KEYS,
    SCROLL,
    SEARCH_DIRECT,
    SCREENSHOT,
    EXTRACT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSite {
    Costco,
    Amazon,
    Google,
}

impl SearchSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Costco => "costco",
            Self::Amazon => "amazon",
            Self::Google => "google",
        }
    }
}

impl fmt::Display for SearchSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated action, one variant per entry of the vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate { url: String },
    Click { index: usize },
    Input { index: usize, text: String },
    SendKeys { keys: String },
    Scroll { down: bool, pages: f64 },
    SearchDirect { site: SearchSite, query: String },
    Screenshot,
    Extract { query: String },
    Done { result: String, success: bool },
    /// A registered non-browser effector, already checked against its
    /// parameter list.
    Tool { name: String, args: Map<String, Value> },
}

impl Action {
    pub fn name(&self) -> &str {
        match self {
            Self::Navigate { .. } => NAVIGATE,
            Self::Click { .. } => CLICK,
            Self::Input { .. } => INPUT,
            Self::SendKeys { .. } => SEND_KEYS,
            Self::Scroll { .. } => SCROLL,
            Self::SearchDirect { .. } => SEARCH_DIRECT,
            Self::Screenshot => SCREENSHOT,
            Self::Extract { .. } => EXTRACT,
            Self::Done { .. } => DONE,
            Self::Tool { name, .. } => name.as_str(),
        }
    }

    /// Parameters as the JSON object handed to the effector.
    pub fn params(&self) -> Value {
        match self {
            Self::Navigate { url } => json!({ "url": url }),
            Self::Click { index } => json!({ "index": index }),
            Self::Input { index, text } => json!({ "index": index, "text": text }),
            Self::SendKeys { keys } => json!({ "keys": keys }),
            Self::Scroll { down, pages } => json!({ "down": down, "pages": pages }),
            Self::SearchDirect { site, query } => json!({ "site": site, "query": query }),
            Self::Screenshot => json!({}),
            Self::Extract { query } => json!({ "query": query }),
            Self::Done { result, success } => json!({ "result": result, "success": success }),
            Self::Tool { args, .. } => Value::Object(args.clone()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn element_index(&self) -> Option<usize> {
        match self {
            Self::Click { index } | Self::Input { index, .. } => Some(*index),
            _ => None,
        }
    }

    fn from_parts(
        name: &str,
        params: Map<String, Value>,
        registry: &EffectorRegistry,
    ) -> Result<Self, MalformedAction> {
        let action = match name {
            NAVIGATE => {
                let p: NavigateParams = typed(name, params)?;
                Self::Navigate { url: p.url }
            }
            CLICK => {
                let p: ClickParams = typed(name, params)?;
                Self::Click { index: p.index }
            }
            INPUT => {
                let p: InputParams = typed(name, params)?;
                Self::Input {
                    index: p.index,
                    text: p.text,
                }
            }
            SEND_KEYS => {
                let p: SendKeysParams = typed(name, params)?;
                Self::SendKeys { keys: p.keys }
            }
            SCROLL => {
                let p: ScrollParams = typed(name, params)?;
                Self::Scroll {
                    down: p.down,
                    pages: p.pages,
                }
            }
            SEARCH_DIRECT => {
                let p: SearchDirectParams = typed(name, params)?;
                Self::SearchDirect {
                    site: p.site,
                    query: p.query,
                }
            }
            SCREENSHOT => {
                let _: NoParams = typed(name, params)?;
                Self::Screenshot
            }
            EXTRACT => {
                let p: ExtractParams = typed(name, params)?;
                Self::Extract { query: p.query }
            }
            DONE => {
                let p: DoneParams = typed(name, params)?;
                Self::Done {
                    result: p.result,
                    success: p.success,
                }
            }
            other => {
                let effector = registry
                    .get(other)
                    .ok_or_else(|| MalformedAction::UnknownAction(other.to_string()))?;
                effector
                    .description()
                    .validate_args(&params)
                    .map_err(|reason| MalformedAction::InvalidParams {
                        action: other.to_string(),
                        reason,
                    })?;
                Self::Tool {
                    name: other.to_string(),
                    args: params,
                }
            }
        };
        Ok(action)
    }
}

fn typed<T: DeserializeOwned>(action: &str, params: Map<String, Value>) -> Result<T, MalformedAction> {
    serde_json::from_value(Value::Object(params)).map_err(|err| MalformedAction::InvalidParams {
        action: action.to_string(),
        reason: err.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NavigateParams {
    url: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ClickParams {
    index: usize,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InputParams {
    index: usize,
    text: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SendKeysParams {
    keys: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ScrollParams {
    down: bool,
    pages: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchDirectParams {
    site: SearchSite,
    query: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtractParams {
    query: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DoneParams {
    result: String,
    success: bool,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    thinking: String,
    #[serde(default)]
    memory: String,
    #[serde(default)]
    next_goal: String,
    action: String,
    #[serde(default)]
    action_params: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedAction {
    #[error("model output is not a valid action request: {0}")]
    Unparseable(String),
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("invalid action_params for `{action}`: {reason}")]
    InvalidParams { action: String, reason: String },
    #[error("element index {index} is out of range (current page lists {available} elements)")]
    IndexOutOfRange { index: usize, available: usize },
}

/// One step's structured decision.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub thinking: String,
    pub memory: String,
    pub next_goal: String,
    pub action: Action,
}

impl ActionRequest {
    pub fn new(action: Action) -> Self {
        Self {
            thinking: String::new(),
            memory: String::new(),
            next_goal: String::new(),
            action,
        }
    }

    /// Parses and validates raw model output.
    ///
    /// The action must be `done` or the name of an effector in `registry`.
    /// `click`/`input` indexes are checked against `perception`, the
    /// perception this step was decided on.
    pub fn parse(
        raw: &str,
        registry: &EffectorRegistry,
        perception: &Perception,
    ) -> Result<Self, MalformedAction> {
        let envelope: Envelope = serde_json::from_str(strip_code_fence(raw))
            .map_err(|err| MalformedAction::Unparseable(err.to_string()))?;

        if envelope.action != DONE && !registry.contains(&envelope.action) {
            return Err(MalformedAction::UnknownAction(envelope.action));
        }

        let action = Action::from_parts(&envelope.action, envelope.action_params, registry)?;
        if let Some(index) = action.element_index() {
            if perception.element(index).is_none() {
                return Err(MalformedAction::IndexOutOfRange {
                    index,
                    available: perception.elements.len(),
                });
            }
        }

        Ok(Self {
            thinking: envelope.thinking,
            memory: envelope.memory,
            next_goal: envelope.next_goal,
            action,
        })
    }

    pub fn to_value(&self) -> Value {
        json!({
            "thinking": self.thinking,
            "memory": self.memory,
            "next_goal": self.next_goal,
            "action": self.action.name(),
            "action_params": self.action.params(),
        })
    }
}

/// Models often wrap JSON in a markdown fence; accept a single fenced block.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effector::{
        Effector, EffectorDescription, EffectorOutput, EffectorResult, ParamKind, ParamSpec,
    };
    use crate::perception::InteractiveElement;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Stub(EffectorDescription);

    #[async_trait]
    impl Effector for Stub {
        fn description(&self) -> &EffectorDescription {
            &self.0
        }

        async fn invoke(&self, _args: Value) -> EffectorResult {
            Ok(EffectorOutput::text("ok"))
        }
    }

    fn browser_registry() -> EffectorRegistry {
        let mut registry = EffectorRegistry::new();
        for name in BROWSER_ACTIONS {
            registry.register(Arc::new(Stub(EffectorDescription::new(name, name, vec![]))));
        }
        registry
    }

    fn page(len: usize) -> Perception {
        Perception {
            url: Some("https://example.com".into()),
            elements: (0..len)
                .map(|i| InteractiveElement::new(i, "button", format!("button {i}")))
                .collect(),
            ..Perception::default()
        }
    }

    fn parse(value: Value, perception: &Perception) -> Result<ActionRequest, MalformedAction> {
        ActionRequest::parse(&value.to_string(), &browser_registry(), perception)
    }

    #[test]
    fn parses_full_envelope() {
        let request = parse(
            json!({
                "thinking": "Add to Cart is [3]",
                "memory": "found paper towels",
                "next_goal": "add to cart",
                "action": "click",
                "action_params": { "index": 3 }
            }),
            &page(4),
        )
        .unwrap();
        assert_eq!(request.action, Action::Click { index: 3 });
        assert_eq!(request.memory, "found paper towels");
    }

    #[test]
    fn click_beyond_element_list_is_malformed() {
        let err = parse(json!({ "action": "click", "action_params": { "index": 5 } }), &page(3))
            .unwrap_err();
        assert_eq!(
            err,
            MalformedAction::IndexOutOfRange {
                index: 5,
                available: 3
            }
        );
    }

    #[test]
    fn negative_index_is_malformed() {
        let err = parse(
            json!({ "action": "input", "action_params": { "index": -1, "text": "milk" } }),
            &page(3),
        )
        .unwrap_err();
        assert!(matches!(err, MalformedAction::InvalidParams { ref action, .. } if action == "input"));
    }

    #[test]
    fn rejects_unknown_action() {
        let err = parse(json!({ "action": "hover", "action_params": {} }), &page(1)).unwrap_err();
        assert_eq!(err, MalformedAction::UnknownAction("hover".into()));
    }

    #[test]
    fn rejects_builtin_not_in_vocabulary() {
        let err = ActionRequest::parse(
            r#"{"action":"click","action_params":{"index":0}}"#,
            &EffectorRegistry::new(),
            &page(1),
        )
        .unwrap_err();
        assert_eq!(err, MalformedAction::UnknownAction("click".into()));
    }

    #[test]
    fn rejects_missing_and_extra_keys() {
        let missing = parse(json!({ "action": "navigate", "action_params": {} }), &page(0));
        assert!(matches!(missing, Err(MalformedAction::InvalidParams { .. })));

        let extra = parse(
            json!({ "action": "navigate", "action_params": { "url": "https://a.b", "new_tab": true } }),
            &page(0),
        );
        assert!(matches!(extra, Err(MalformedAction::InvalidParams { .. })));

        let done_without_success = parse(
            json!({ "action": "done", "action_params": { "result": "ok" } }),
            &page(0),
        );
        assert!(matches!(done_without_success, Err(MalformedAction::InvalidParams { .. })));
    }

    #[test]
    fn screenshot_takes_no_params() {
        let request = parse(json!({ "action": "screenshot" }), &page(0)).unwrap();
        assert_eq!(request.action, Action::Screenshot);
        assert!(parse(
            json!({ "action": "screenshot", "action_params": { "full": true } }),
            &page(0)
        )
        .is_err());
    }

    #[test]
    fn search_site_is_enumerated() {
        let ok = parse(
            json!({ "action": "search_direct", "action_params": { "site": "costco", "query": "organic milk" } }),
            &page(0),
        )
        .unwrap();
        assert_eq!(
            ok.action,
            Action::SearchDirect {
                site: SearchSite::Costco,
                query: "organic milk".into()
            }
        );
        assert!(parse(
            json!({ "action": "search_direct", "action_params": { "site": "ebay", "query": "milk" } }),
            &page(0)
        )
        .is_err());
    }

    #[test]
    fn done_is_always_available() {
        let request = ActionRequest::parse(
            r#"{"action":"done","action_params":{"result":"Found price: $12.99","success":true}}"#,
            &EffectorRegistry::new(),
            &Perception::empty(),
        )
        .unwrap();
        assert!(request.action.is_terminal());
    }

    #[test]
    fn tool_params_follow_declared_specs() {
        let mut registry = EffectorRegistry::new();
        registry.register(Arc::new(Stub(EffectorDescription::new(
            "divide",
            "Divide a by b",
            vec![
                ParamSpec::new("a", ParamKind::Number, ""),
                ParamSpec::new("b", ParamKind::Number, ""),
            ],
        ))));
        let request = ActionRequest::parse(
            r#"{"action":"divide","action_params":{"a":10,"b":0}}"#,
            &registry,
            &Perception::empty(),
        )
        .unwrap();
        assert_eq!(request.action.name(), "divide");
        assert_eq!(request.action.params(), json!({ "a": 10, "b": 0 }));

        let err = ActionRequest::parse(
            r#"{"action":"divide","action_params":{"a":10}}"#,
            &registry,
            &Perception::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, MalformedAction::InvalidParams { .. }));
    }

    #[test]
    fn accepts_fenced_json_but_not_prose() {
        let fenced = "```json\n{\"action\":\"scroll\",\"action_params\":{\"down\":true,\"pages\":1}}\n```";
        let request = ActionRequest::parse(fenced, &browser_registry(), &page(0)).unwrap();
        assert_eq!(
            request.action,
            Action::Scroll {
                down: true,
                pages: 1.0
            }
        );
        let prose = ActionRequest::parse("I will click the button", &browser_registry(), &page(1));
        assert!(matches!(prose, Err(MalformedAction::Unparseable(_))));
    }

    #[test]
    fn to_value_uses_wire_names() {
        let request = ActionRequest::new(Action::SendKeys { keys: "Enter".into() });
        let value = request.to_value();
        assert_eq!(value["action"], "send_keys");
        assert_eq!(value["action_params"], json!({ "keys": "Enter" }));
    }
}
