//! Canonical tool catalog and the action validator (spec.md §4.A).
//!
//! The catalog is fixed at compile time, so no interior mutability is
//! needed: this registry is a plain lookup table built once in
//! `ToolRegistry::new()`.

use std::collections::BTreeMap;

use agentrun_types::{Action, ParamSpec, ToolDefinition, ToolExecution};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub issues: Vec<String>,
}

impl ValidationOutcome {
    fn ok() -> Self {
        Self {
            ok: true,
            issues: Vec::new(),
        }
    }

    fn fail(issues: Vec<String>) -> Self {
        Self { ok: false, issues }
    }
}

#[derive(Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: default_catalog(),
        }
    }

    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn get(&self, kind: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == kind)
    }

    /// `ok=false` iff `action.type` is unknown, or any parameter marked
    /// `required` is absent/null. Extra parameters are tolerated. The `wait`
    /// tool additionally requires at least one of `ms`/`until` (spec.md §6),
    /// which a flat `required` flag can't express, so it's special-cased.
    pub fn validate(&self, action: &Action) -> ValidationOutcome {
        let Some(def) = self.get(&action.kind) else {
            return ValidationOutcome::fail(vec![format!("Unknown action type \"{}\"", action.kind)]);
        };

        let mut issues = Vec::new();
        for name in def.required_params() {
            if !param_present(&action.params, name) {
                issues.push(format!("Missing required parameter \"{name}\""));
            }
        }

        if action.kind == "wait"
            && !param_present(&action.params, "ms")
            && !param_present(&action.params, "until")
        {
            issues.push("wait requires at least one of \"ms\" or \"until\"".to_string());
        }

        if issues.is_empty() {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::fail(issues)
        }
    }
}

fn param_present(params: &serde_json::Map<String, Value>, name: &str) -> bool {
    matches!(params.get(name), Some(v) if !v.is_null())
}

fn schema(entries: &[(&str, &str, bool)]) -> BTreeMap<String, ParamSpec> {
    entries
        .iter()
        .map(|(name, description, required)| {
            (
                name.to_string(),
                ParamSpec {
                    description: description.to_string(),
                    required: *required,
                },
            )
        })
        .collect()
}

fn default_catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "navigate".to_string(),
            description: "Navigate the active tab to a URL.".to_string(),
            schema: schema(&[
                ("url", "Absolute URL to navigate to.", true),
                ("tabId", "Target tab, defaults to the active tab.", false),
                ("waitFor", "Optional selector to wait for after load.", false),
            ]),
            execution: ToolExecution {
                invokes_executor: true,
                expected_latency_ms: 2_000,
            },
            safety_notes: vec![
                "Rejected if the URL starts with a blocked origin prefix.".to_string(),
            ],
        },
        ToolDefinition {
            name: "click".to_string(),
            description: "Click an element matching a CSS selector.".to_string(),
            schema: schema(&[
                ("selector", "CSS selector of the element to click.", true),
                ("tabId", "Target tab, defaults to the active tab.", false),
                ("button", "left | right | middle, defaults to left.", false),
                (
                    "waitForNavigation",
                    "Wait for a navigation to settle after the click.",
                    false,
                ),
            ]),
            execution: ToolExecution {
                invokes_executor: true,
                expected_latency_ms: 500,
            },
            safety_notes: vec!["Rejected if the selector is restricted.".to_string()],
        },
        ToolDefinition {
            name: "type".to_string(),
            description: "Type text into an element matching a CSS selector.".to_string(),
            schema: schema(&[
                ("selector", "CSS selector of the target element.", true),
                ("text", "Text to type.", true),
                ("tabId", "Target tab, defaults to the active tab.", false),
                ("clear", "Clear existing content before typing.", false),
                ("submit", "Submit the enclosing form after typing.", false),
            ]),
            execution: ToolExecution {
                invokes_executor: true,
                expected_latency_ms: 500,
            },
            safety_notes: vec!["Rejected if the selector is restricted.".to_string()],
        },
        ToolDefinition {
            name: "wait".to_string(),
            description: "Pause until a condition or a fixed duration elapses.".to_string(),
            schema: schema(&[
                ("ms", "Milliseconds to sleep.", false),
                ("until", "Condition descriptor to wait for.", false),
                ("tabId", "Target tab, defaults to the active tab.", false),
                ("timeoutMs", "Ceiling for the wait, clamped to the safety policy.", false),
            ]),
            execution: ToolExecution {
                invokes_executor: true,
                expected_latency_ms: 1_000,
            },
            safety_notes: vec![
                "`ms` and `timeoutMs` are clamped to the configured max wait.".to_string(),
            ],
        },
        ToolDefinition {
            name: "scroll".to_string(),
            description: "Scroll the page or an element.".to_string(),
            schema: schema(&[
                ("direction", "up | down | top | bottom.", true),
                ("tabId", "Target tab, defaults to the active tab.", false),
                ("amount", "Pixels, or a 0-1 fraction; defaults to 0.6.", false),
                ("selector", "Optional scroll container selector.", false),
            ]),
            execution: ToolExecution {
                invokes_executor: true,
                expected_latency_ms: 300,
            },
            safety_notes: Vec::new(),
        },
        ToolDefinition {
            name: "extract".to_string(),
            description: "Extract an attribute from elements matching a selector.".to_string(),
            schema: schema(&[
                (
                    "attribute",
                    "DOM attribute to read, e.g. textContent or innerHTML.",
                    true,
                ),
                ("tabId", "Target tab, defaults to the active tab.", false),
                ("selector", "CSS selector, defaults to *.", false),
                ("purpose", "Free-text note on why this extraction is needed.", false),
            ]),
            execution: ToolExecution {
                invokes_executor: true,
                expected_latency_ms: 500,
            },
            safety_notes: vec!["Output is capped at 10 non-empty values.".to_string()],
        },
        ToolDefinition {
            name: "finish".to_string(),
            description: "Declare the task complete and return control.".to_string(),
            schema: schema(&[
                ("status", "success | failed.", true),
                ("summary", "Human-readable summary of the outcome.", true),
            ]),
            execution: ToolExecution {
                invokes_executor: true,
                expected_latency_ms: 0,
            },
            safety_notes: Vec::new(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn action(kind: &str, params: serde_json::Value) -> Action {
        Action {
            kind: kind.to_string(),
            params: params.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn unknown_action_type_fails() {
        let registry = ToolRegistry::new();
        let outcome = registry.validate(&action("teleport", json!({})));
        assert!(!outcome.ok);
        assert!(outcome.issues[0].contains("Unknown action type"));
    }

    #[test]
    fn missing_required_param_is_reported_by_name() {
        let registry = ToolRegistry::new();
        let outcome = registry.validate(&action("click", json!({})));
        assert!(!outcome.ok);
        assert!(outcome.issues.iter().any(|i| i.contains("\"selector\"")));
    }

    #[test]
    fn extra_params_are_tolerated() {
        let registry = ToolRegistry::new();
        let outcome = registry.validate(&action(
            "navigate",
            json!({"url": "https://example.com", "extra": true}),
        ));
        assert!(outcome.ok);
    }

    #[test]
    fn wait_requires_ms_or_until() {
        let registry = ToolRegistry::new();
        assert!(!registry.validate(&action("wait", json!({}))).ok);
        assert!(registry.validate(&action("wait", json!({"ms": 100}))).ok);
        assert!(registry
            .validate(&action("wait", json!({"until": "idle"})))
            .ok);
    }

    #[test]
    fn null_required_param_counts_as_missing() {
        let registry = ToolRegistry::new();
        let outcome = registry.validate(&action("navigate", json!({"url": null})));
        assert!(!outcome.ok);
    }

    #[test]
    fn catalog_lists_all_seven_tools() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.list().len(), 7);
    }
}
