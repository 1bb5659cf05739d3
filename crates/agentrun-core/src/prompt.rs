use agentrun_types::{MemoryEntry, Task, ToolDefinition};

use crate::policy::SafetyPolicy;

const HTML_EXCERPT_LIMIT: usize = 1500;
const MEMORY_WINDOW: usize = 12;

/// Assembles the prompt handed to `Planner::plan` (spec.md §4.C). Input
/// preparation is the Orchestrator's responsibility, not the Planner's —
/// this free function is what it calls before invoking the trait object.
pub fn build_prompt(task: &Task, recent_memory: &[MemoryEntry], tools: &[ToolDefinition], policy: &SafetyPolicy) -> String {
    let mut out = String::new();

    out.push_str("You are a browsing agent. Respond with a single JSON object ");
    out.push_str("with fields: \"thought\" (string), optional \"action\" ({\"type\", \"params\"}), ");
    out.push_str("optional \"finish\" ({\"status\", \"summary\"}), optional \"caution\" (string). ");
    out.push_str("Return ONLY the JSON object, no prose, no code fences.\n\n");

    out.push_str(&format!("Goal: {}\n", task.goal));
    if let Some(context) = &task.context {
        if let Some(url) = &context.url {
            out.push_str(&format!("Current URL: {url}\n"));
        }
        if let Some(title) = &context.title {
            out.push_str(&format!("Page title: {title}\n"));
        }
        if let Some(description) = &context.description {
            out.push_str(&format!("Page description: {description}\n"));
        }
        if let Some(html) = &context.html_excerpt {
            let truncated: String = html.chars().take(HTML_EXCERPT_LIMIT).collect();
            out.push_str(&format!("Page HTML excerpt: {truncated}\n"));
        }
    }

    out.push_str("\nRecent memory:\n");
    let window_start = recent_memory.len().saturating_sub(MEMORY_WINDOW);
    for entry in &recent_memory[window_start..] {
        out.push_str(&entry.as_prompt_line());
        out.push('\n');
    }

    out.push_str("\nAvailable tools:\n");
    for tool in tools {
        let required: Vec<&str> = tool.required_params().collect();
        out.push_str(&format!(
            "- {}: {} (required params: {})\n",
            tool.name,
            tool.description,
            if required.is_empty() { "none".to_string() } else { required.join(", ") }
        ));
        for note in &tool.safety_notes {
            out.push_str(&format!("  safety: {note}\n"));
        }
    }

    out.push_str("\nSafety policy:\n");
    out.push_str(&format!("- blocked origin prefixes: {}\n", policy.blocked_origins.join(", ")));
    out.push_str(&format!("- restricted selectors: {}\n", policy.restricted_selectors.join(", ")));
    out.push_str(&format!("- max wait per action: {}ms\n", policy.max_wait_ms));

    out
}
