use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use step_agent::{
    Effector, EffectorDescription, EffectorError, EffectorOutput, EffectorResult, ParamKind,
    ParamSpec,
};

const CANNED_RESULTS: [(&str, &str); 4] = [
    (
        "python",
        "Python is a high-level, interpreted programming language known for its simplicity and readability.",
    ),
    (
        "rust",
        "Rust is a systems programming language focused on safety, speed, and concurrency.",
    ),
    (
        "agent",
        "An agent loop asks a model for one action at a time, runs it, and feeds the result back.",
    ),
    (
        "weather",
        "The weather today is sunny with a high of 75°F and a low of 60°F.",
    ),
];

pub fn search_web(query: &str) -> String {
    let lowered = query.to_lowercase();
    CANNED_RESULTS
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, result)| format!("Search results for '{query}': {result}"))
        .unwrap_or_else(|| {
            format!(
                "Search results for '{query}': No specific information found. This is a simulated search tool."
            )
        })
}

pub fn weather_report(city: &str) -> Value {
    let lowered = city.to_lowercase();
    if lowered.contains("san francisco") {
        json!({ "city": "San Francisco", "temperature": "15°C", "conditions": "Foggy" })
    } else if lowered.contains("new york") {
        json!({ "city": "New York", "temperature": "22°C", "conditions": "Sunny" })
    } else {
        json!({ "city": city, "temperature": "20°C", "conditions": "Clear skies" })
    }
}

fn parse<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, EffectorError> {
    serde_json::from_value(args)
        .map_err(|e| EffectorError::InvalidInput(format!("invalid arguments: {e}")))
}

pub struct SearchWebTool {
    description: EffectorDescription,
}

impl SearchWebTool {
    pub fn new() -> Self {
        Self {
            description: EffectorDescription::new(
                "search_web",
                "Search the web for information (simulated)",
                vec![ParamSpec::new("query", ParamKind::String, "The search query")],
            ),
        }
    }
}

impl Default for SearchWebTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

#[async_trait]
impl Effector for SearchWebTool {
    fn description(&self) -> &EffectorDescription {
        &self.description
    }

    async fn invoke(&self, args: Value) -> EffectorResult {
        let SearchArgs { query } = parse(args)?;
        if query.trim().is_empty() {
            return Err(EffectorError::InvalidInput("query must not be empty".into()));
        }
        Ok(EffectorOutput::text(search_web(&query)))
    }
}

pub struct CurrentTimeTool {
    description: EffectorDescription,
}

impl CurrentTimeTool {
    pub fn new() -> Self {
        Self {
            description: EffectorDescription::new(
                "get_current_time",
                "Get the current local time",
                vec![],
            ),
        }
    }
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Effector for CurrentTimeTool {
    fn description(&self) -> &EffectorDescription {
        &self.description
    }

    async fn invoke(&self, _args: Value) -> EffectorResult {
        Ok(EffectorOutput::text(
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ))
    }
}

pub struct WeatherTool {
    description: EffectorDescription,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self {
            description: EffectorDescription::new(
                "get_weather",
                "Get the current weather for a city (simulated)",
                vec![ParamSpec::new("city", ParamKind::String, "The name of the city")],
            ),
        }
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct WeatherArgs {
    city: String,
}

#[async_trait]
impl Effector for WeatherTool {
    fn description(&self) -> &EffectorDescription {
        &self.description
    }

    async fn invoke(&self, args: Value) -> EffectorResult {
        let WeatherArgs { city } = parse(args)?;
        Ok(EffectorOutput::new(weather_report(&city)))
    }
}

/// search_web, get_current_time and get_weather.
pub fn search_tools() -> Vec<Arc<dyn Effector>> {
    vec![
        Arc::new(SearchWebTool::new()) as Arc<dyn Effector>,
        Arc::new(CurrentTimeTool::new()),
        Arc::new(WeatherTool::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert!(search_web("Tell me about Rust").contains("systems programming language"));
        assert!(search_web("quantum gravity").contains("No specific information found"));
    }

    #[test]
    fn weather_is_canned_per_city() {
        assert_eq!(weather_report("san francisco")["conditions"], "Foggy");
        assert_eq!(weather_report("Paris")["city"], "Paris");
    }

    #[tokio::test]
    async fn current_time_format() {
        let output = CurrentTimeTool::new().invoke(json!({})).await.unwrap();
        let text = output.summary();
        assert!(chrono::NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let err = SearchWebTool::new()
            .invoke(json!({ "query": "  " }))
            .await
            .unwrap_err();
        assert!(matches!(err, EffectorError::InvalidInput(_)));
    }
}
