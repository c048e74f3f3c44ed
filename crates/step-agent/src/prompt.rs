use crate::effector::{EffectorDescription, EffectorRegistry};
use crate::history::LoopState;
use crate::perception::Perception;

const OUTPUT_CONTRACT: &str = r#"## Output Format
Respond with exactly one JSON object and nothing else:
{
  "thinking": "Your reasoning process",
  "memory": "Updated context to remember",
  "next_goal": "What you're trying to achieve next",
  "action": "action_name",
  "action_params": { ... }
}
`action_params` must contain exactly the parameters listed for the chosen action.
When the task is complete, or cannot be completed, use:
{"action": "done", "action_params": {"result": "Final answer", "success": true}}"#;

const TOOL_RULES: &str = r#"## Rules
1. Only use the actions listed above.
2. Read the Agent History to see what you already tried and what happened.
3. If an action failed, adapt instead of repeating it unchanged.
4. Call "done" as soon as you can answer."#;

/// One action entry: name, description and the JSON schema its
/// `action_params` must satisfy.
pub fn render_effector(description: &EffectorDescription) -> String {
    format!(
        "- {}: {}\n  action_params schema: {}\n",
        description.name,
        description.description,
        description.input_schema()
    )
}

/// Builds a system prompt listing every registered effector plus `done`.
pub fn render_system_prompt(registry: &EffectorRegistry) -> String {
    let mut prompt = String::from(
        "You are a helpful assistant. Use the available actions to complete the user's task.\n\n## Actions\n",
    );
    for description in registry.descriptions() {
        prompt.push_str(&render_effector(&description));
    }
    prompt.push_str(
        "- done: Finish the task and report the answer\n  action_params: {\"result\": string, \"success\": boolean}\n\n",
    );
    prompt.push_str(OUTPUT_CONTRACT);
    prompt.push_str("\n\n");
    prompt.push_str(TOOL_RULES);
    prompt
}

/// Renders the per-step user message.
pub fn render_step_context(
    state: &LoopState,
    perception: &Perception,
    history_window: usize,
    notice: Option<&str>,
) -> String {
    let memory = if state.memory().is_empty() {
        "Just started"
    } else {
        state.memory()
    };
    let mut context = format!(
        "Step: {step}/{max}\nMemory: {memory}\n\nAgent History (what you did and what happened):\n{history}\n\nCurrent State:\n{perception}",
        step = state.step() + 1,
        max = state.max_steps(),
        history = state.format_history(history_window),
        perception = perception.render(),
    );
    if let Some(notice) = notice {
        context.push_str(&format!("\nNotice: {notice}\n"));
    }
    context.push_str(&format!(
        "\nWhat should you do next to complete this task: {}",
        state.task()
    ));
    context
}
