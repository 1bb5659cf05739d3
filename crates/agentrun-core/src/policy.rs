/// Safety policy constants (spec.md §6). Hard-coded in spirit, but sourced
/// from environment variables once at startup and threaded explicitly from
/// there on — no global mutable state, no persisted config store.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    pub max_steps: usize,
    pub max_parallel_tasks: usize,
    pub max_wait_ms: u64,
    pub blocked_origins: Vec<String>,
    pub restricted_selectors: Vec<String>,
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self {
            max_steps: 20,
            max_parallel_tasks: 1,
            max_wait_ms: 5_000,
            blocked_origins: vec![
                "file://".to_string(),
                "chrome://".to_string(),
                "chrome-extension://".to_string(),
            ],
            restricted_selectors: vec![
                "input[type=\"password\"]".to_string(),
                "input[autocomplete=\"cc-number\"]".to_string(),
            ],
        }
    }
}

impl SafetyPolicy {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_steps: env_usize("AGENT_MAX_STEPS", default.max_steps),
            max_parallel_tasks: env_usize("AGENT_MAX_PARALLEL_TASKS", default.max_parallel_tasks),
            max_wait_ms: env_u64("AGENT_MAX_WAIT_MS", default.max_wait_ms),
            blocked_origins: env_list("AGENT_BLOCKED_ORIGINS", default.blocked_origins),
            restricted_selectors: env_list("AGENT_RESTRICTED_SELECTORS", default.restricted_selectors),
        }
    }

    pub fn is_blocked_origin(&self, url: &str) -> bool {
        self.blocked_origins.iter().any(|prefix| url.starts_with(prefix.as_str()))
    }

    pub fn is_restricted_selector(&self, selector: &str) -> bool {
        self.restricted_selectors.iter().any(|s| s == selector)
    }

    pub fn clamp_wait_ms(&self, ms: u64) -> u64 {
        ms.min(self.max_wait_ms)
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_list(name: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => default,
    }
}

/// Non-policy startup configuration — server bind address, model provider
/// selection — grouped separately from `SafetyPolicy` since it has no
/// bearing on Executor/Planner safety checks.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub server_port: Option<u16>,
    pub model_provider: String,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self {
            server_port: std::env::var("AGENT_SERVER_PORT").ok().and_then(|v| v.parse().ok()),
            model_provider: std::env::var("AGENT_MODEL_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_defaults() {
        let policy = SafetyPolicy::default();
        assert_eq!(policy.max_parallel_tasks, 1);
    }

    #[test]
    fn wait_is_clamped_to_max_wait_ms() {
        let policy = SafetyPolicy::default();
        assert_eq!(policy.clamp_wait_ms(policy.max_wait_ms * 10), policy.max_wait_ms);
        assert_eq!(policy.clamp_wait_ms(10), 10);
    }

    #[test]
    fn blocked_origin_matches_prefix() {
        let policy = SafetyPolicy::default();
        assert!(policy.is_blocked_origin("file:///etc/passwd"));
        assert!(!policy.is_blocked_origin("https://example.com"));
    }
}
