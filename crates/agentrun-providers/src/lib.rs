//! The Planner external contract (spec.md §4.C) and concrete adapters.
//!
//! One trait, one free function (`build_planner`) that picks a concrete
//! adapter from configuration, and a struct-per-provider holding an API
//! key, base URL, default model, and a `reqwest::Client`. Prompt assembly
//! stays in `agentrun-core` — this crate only turns a rendered prompt into
//! a `PlanOutput`.

use std::sync::Arc;

use agentrun_types::{AgentError, PlanOutput};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct PlannerInfo {
    pub id: String,
    pub default_model: String,
}

#[async_trait]
pub trait Planner: Send + Sync {
    fn info(&self) -> PlannerInfo;

    /// Sole operation. `prompt` is the fully-assembled Orchestrator prompt;
    /// the adapter's only job is calling the model and parsing its reply.
    async fn plan(&self, prompt: &str) -> Result<PlanOutput, AgentError>;
}

/// Direct parse, then fall back to the substring between the first `{` and
/// the last `}` (models wrap JSON in prose or code fences). Both failing is
/// a `PlannerParse` error, never a panic.
pub fn parse_plan_output(raw: &str) -> Result<PlanOutput, AgentError> {
    if let Ok(output) = serde_json::from_str::<PlanOutput>(raw) {
        return Ok(output);
    }

    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<PlanOutput>(&raw[start..=end])
                .map_err(|e| AgentError::PlannerParse(e.to_string()))
        }
        _ => Err(AgentError::PlannerParse(
            "no JSON object found in planner output".to_string(),
        )),
    }
}

fn is_placeholder_key(key: &str) -> bool {
    let trimmed = key.trim();
    trimmed.is_empty() || trimmed.starts_with("sk-placeholder") || trimmed == "changeme"
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !is_placeholder_key(v))
}

pub struct OpenAiPlanner {
    api_key: String,
    default_model: String,
    client: Client,
}

impl OpenAiPlanner {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            api_key: env_key("OPENAI_API_KEY")?,
            default_model: std::env::var("AGENT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            client: Client::new(),
        })
    }
}

#[async_trait]
impl Planner for OpenAiPlanner {
    fn info(&self) -> PlannerInfo {
        PlannerInfo {
            id: "openai".to_string(),
            default_model: self.default_model.clone(),
        }
    }

    async fn plan(&self, prompt: &str) -> Result<PlanOutput, AgentError> {
        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.default_model,
                "response_format": {"type": "json_object"},
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|e| AgentError::Executor(format!("openai request failed: {e}")))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Executor(format!("openai response decode failed: {e}")))?;

        let text = value["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        parse_plan_output(text)
    }
}

pub struct AnthropicPlanner {
    api_key: String,
    default_model: String,
    client: Client,
}

impl AnthropicPlanner {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            api_key: env_key("ANTHROPIC_API_KEY")?,
            default_model: std::env::var("AGENT_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-latest".to_string()),
            client: Client::new(),
        })
    }
}

#[async_trait]
impl Planner for AnthropicPlanner {
    fn info(&self) -> PlannerInfo {
        PlannerInfo {
            id: "anthropic".to_string(),
            default_model: self.default_model.clone(),
        }
    }

    async fn plan(&self, prompt: &str) -> Result<PlanOutput, AgentError> {
        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("anthropic-version", "2023-06-01")
            .header("x-api-key", &self.api_key)
            .json(&json!({
                "model": self.default_model,
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|e| AgentError::Executor(format!("anthropic request failed: {e}")))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Executor(format!("anthropic response decode failed: {e}")))?;

        let text = value["content"][0]["text"].as_str().unwrap_or_default();
        parse_plan_output(text)
    }
}

pub struct GeminiPlanner {
    api_key: String,
    default_model: String,
    client: Client,
}

impl GeminiPlanner {
    pub fn from_env() -> Option<Self> {
        let api_key = env_key("GOOGLE_GENERATIVE_AI_API_KEY").or_else(|| env_key("GEMINI_API_KEY"))?;
        Some(Self {
            api_key,
            default_model: std::env::var("AGENT_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            client: Client::new(),
        })
    }
}

#[async_trait]
impl Planner for GeminiPlanner {
    fn info(&self) -> PlannerInfo {
        PlannerInfo {
            id: "gemini".to_string(),
            default_model: self.default_model.clone(),
        }
    }

    async fn plan(&self, prompt: &str) -> Result<PlanOutput, AgentError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.default_model, self.api_key
        );
        let response = self
            .client
            .post(url)
            .json(&json!({
                "contents": [{"parts": [{"text": prompt}]}],
            }))
            .send()
            .await
            .map_err(|e| AgentError::Executor(format!("gemini request failed: {e}")))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Executor(format!("gemini response decode failed: {e}")))?;

        let text = value["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or_default();
        parse_plan_output(text)
    }
}

/// Selects a concrete adapter by `AGENT_MODEL_PROVIDER` (default `"openai"`).
/// Returns `None` when the selected provider has no usable API key — callers
/// surface that as `AgentError::Config`.
pub fn build_planner() -> Option<Arc<dyn Planner>> {
    let provider = std::env::var("AGENT_MODEL_PROVIDER").unwrap_or_else(|_| "openai".to_string());
    match provider.as_str() {
        "anthropic" => AnthropicPlanner::from_env().map(|p| Arc::new(p) as Arc<dyn Planner>),
        "gemini" | "google" => GeminiPlanner::from_env().map(|p| Arc::new(p) as Arc<dyn Planner>),
        _ => OpenAiPlanner::from_env().map(|p| Arc::new(p) as Arc<dyn Planner>),
    }
}
