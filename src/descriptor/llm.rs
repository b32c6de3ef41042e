//! Generation backend settings declared in descriptor headers.
//!
//! Settings layer from the root descriptor down to the source's closest ancestor. The
//! layered [`LlmConfig`] is then resolved into one [`AgentConfig`] per role.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::ConfigError;

pub const ROLE_COORDINATOR: &str = "coordinator";
pub const ROLE_TRANSLATOR: &str = "translator";

pub const PROVIDER_OPENAI: &str = "openai";
pub const PROVIDER_ANTHROPIC: &str = "anthropic";
pub const PROVIDER_VERTEX: &str = "vertex";

/// `[llm]` table of a descriptor header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_completions_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinator_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translator_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Per-role overrides (`[[llm.agent]]`)
    #[serde(default, rename = "agent", skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentConfig>,
}

/// Settings for one role. Also used as the fully resolved form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_completions_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl AgentConfig {
    pub fn provider(&self) -> &str {
        non_blank(&self.provider).unwrap_or(PROVIDER_OPENAI)
    }

    pub fn model(&self) -> Option<&str> {
        non_blank(&self.model)
    }

    pub fn base_url(&self) -> Option<&str> {
        non_blank(&self.base_url)
    }

    pub fn chat_completions_path(&self) -> Option<&str> {
        non_blank(&self.chat_completions_path)
    }

    fn normalized_role(&self) -> String {
        self.role
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn is_blank(value: &Option<String>) -> bool {
    non_blank(value).is_none()
}

/// Replace `target` with `value` when `value` is non-blank.
fn override_str(target: &mut Option<String>, value: &Option<String>) {
    if !is_blank(value) {
        target.clone_from(value);
    }
}

/// Fill `target` from `fallback` when `target` is blank.
fn inherit_str(target: &mut Option<String>, fallback: &Option<String>) {
    if is_blank(target) {
        target.clone_from(fallback);
    }
}

/// Layer `over` on top of `base`. Non-blank fields win, headers merge key by key and
/// agents replace by role or append.
pub fn merge_llm(base: &LlmConfig, over: &LlmConfig) -> LlmConfig {
    let mut out = base.clone();
    override_str(&mut out.provider, &over.provider);
    override_str(&mut out.base_url, &over.base_url);
    override_str(&mut out.chat_completions_path, &over.chat_completions_path);
    override_str(&mut out.api_key, &over.api_key);
    override_str(&mut out.api_key_env, &over.api_key_env);
    override_str(&mut out.coordinator_model, &over.coordinator_model);
    override_str(&mut out.translator_model, &over.translator_model);
    if over.temperature.is_some() {
        out.temperature = over.temperature;
    }
    if over.max_tokens.is_some() {
        out.max_tokens = over.max_tokens;
    }
    if over.timeout_seconds.is_some() {
        out.timeout_seconds = over.timeout_seconds;
    }
    out.headers
        .extend(over.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

    for agent in &over.agents {
        let role = agent.normalized_role();
        let existing = if role.is_empty() {
            None
        } else {
            out.agents
                .iter_mut()
                .find(|existing| existing.normalized_role() == role)
        };
        match existing {
            Some(slot) => *slot = agent.clone(),
            None => out.agents.push(agent.clone()),
        }
    }
    out
}

fn merge_agent(base: &AgentConfig, over: Option<&AgentConfig>) -> AgentConfig {
    let mut out = base.clone();
    let Some(over) = over else {
        return out;
    };
    override_str(&mut out.provider, &over.provider);
    override_str(&mut out.base_url, &over.base_url);
    override_str(&mut out.chat_completions_path, &over.chat_completions_path);
    override_str(&mut out.api_key, &over.api_key);
    override_str(&mut out.api_key_env, &over.api_key_env);
    override_str(&mut out.model, &over.model);
    if over.temperature.is_some() {
        out.temperature = over.temperature;
    }
    if over.max_tokens.is_some() {
        out.max_tokens = over.max_tokens;
    }
    if over.timeout_seconds.is_some() {
        out.timeout_seconds = over.timeout_seconds;
    }
    out.headers
        .extend(over.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
    out
}

fn agents_by_role(agents: &[AgentConfig]) -> Result<BTreeMap<String, &AgentConfig>, ConfigError> {
    let mut out = BTreeMap::new();
    for agent in agents {
        let role = agent.normalized_role();
        if role.is_empty() {
            return Err(ConfigError::MissingRole);
        }
        if role != ROLE_COORDINATOR && role != ROLE_TRANSLATOR {
            return Err(ConfigError::UnknownRole(
                agent.role.clone().unwrap_or_default(),
            ));
        }
        out.insert(role, agent);
    }
    Ok(out)
}

/// Resolve the layered settings into `(coordinator, translator)`.
///
/// The translator inherits every field it leaves blank from the resolved coordinator,
/// with headers merged on top of the coordinator's.
pub fn resolve_agents(cfg: &LlmConfig) -> Result<(AgentConfig, AgentConfig), ConfigError> {
    let by_role = agents_by_role(&cfg.agents)?;

    let base = AgentConfig {
        role: None,
        provider: cfg.provider.clone(),
        base_url: cfg.base_url.clone(),
        chat_completions_path: cfg.chat_completions_path.clone(),
        api_key: cfg.api_key.clone(),
        api_key_env: cfg.api_key_env.clone(),
        model: None,
        temperature: cfg.temperature,
        max_tokens: cfg.max_tokens,
        headers: cfg.headers.clone(),
        timeout_seconds: cfg.timeout_seconds,
    };

    let mut coordinator = merge_agent(&base, by_role.get(ROLE_COORDINATOR).copied());
    inherit_str(&mut coordinator.model, &cfg.coordinator_model);
    coordinator.role = Some(ROLE_COORDINATOR.to_string());
    let coordinator = apply_agent_defaults(coordinator);

    let mut translator = merge_agent(&base, by_role.get(ROLE_TRANSLATOR).copied());
    inherit_str(&mut translator.model, &cfg.translator_model);
    inherit_str(&mut translator.provider, &coordinator.provider);
    inherit_str(&mut translator.base_url, &coordinator.base_url);
    inherit_str(
        &mut translator.chat_completions_path,
        &coordinator.chat_completions_path,
    );
    inherit_str(&mut translator.api_key, &coordinator.api_key);
    inherit_str(&mut translator.api_key_env, &coordinator.api_key_env);
    translator.temperature = translator.temperature.or(coordinator.temperature);
    translator.max_tokens = translator.max_tokens.or(coordinator.max_tokens);
    translator.timeout_seconds = translator.timeout_seconds.or(coordinator.timeout_seconds);
    let mut headers = coordinator.headers.clone();
    headers.extend(std::mem::take(&mut translator.headers));
    translator.headers = headers;
    translator.role = Some(ROLE_TRANSLATOR.to_string());
    let translator = apply_agent_defaults(translator);

    Ok((coordinator, translator))
}

/// Fill provider-specific defaults for endpoint path, base URL and credential variable.
pub fn apply_agent_defaults(mut cfg: AgentConfig) -> AgentConfig {
    let provider = cfg.provider().trim().to_string();

    let (path, base_url, key_env) = match provider.as_str() {
        PROVIDER_OPENAI => (
            Some("/chat/completions"),
            Some("https://api.openai.com/v1"),
            Some("OPENAI_API_KEY"),
        ),
        // OpenAI-compatible endpoint; base URL and credentials must be explicit
        PROVIDER_VERTEX => (Some("/chat/completions"), None, None),
        PROVIDER_ANTHROPIC => (
            Some("/v1/messages"),
            Some("https://api.anthropic.com"),
            Some("ANTHROPIC_API_KEY"),
        ),
        _ => (None, None, None),
    };

    let fill = |target: &mut Option<String>, default: Option<&str>| {
        if is_blank(target)
            && let Some(default) = default
        {
            *target = Some(default.to_string());
        }
    };
    fill(&mut cfg.chat_completions_path, path);
    fill(&mut cfg.base_url, base_url);
    fill(&mut cfg.api_key_env, key_env);
    cfg.provider = Some(provider);
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(role: &str) -> AgentConfig {
        AgentConfig {
            role: Some(role.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_llm_non_blank_fields_override() {
        let base = LlmConfig {
            provider: Some("openai".to_string()),
            translator_model: Some("gpt-4o".to_string()),
            temperature: Some(0.2),
            headers: BTreeMap::from([("X-A".to_string(), "1".to_string())]),
            ..Default::default()
        };
        let over = LlmConfig {
            provider: Some("  ".to_string()),
            translator_model: Some("gpt-4o-mini".to_string()),
            headers: BTreeMap::from([("X-B".to_string(), "2".to_string())]),
            ..Default::default()
        };

        let merged = merge_llm(&base, &over);
        assert_eq!(merged.provider.as_deref(), Some("openai"));
        assert_eq!(merged.translator_model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(merged.temperature, Some(0.2));
        assert_eq!(merged.headers.len(), 2);
    }

    #[test]
    fn test_merge_llm_agents_replace_by_role_or_append() {
        let mut first = agent("translator");
        first.model = Some("a".to_string());
        let base = LlmConfig {
            agents: vec![first],
            ..Default::default()
        };

        let mut second = agent("Translator");
        second.model = Some("b".to_string());
        let over = LlmConfig {
            agents: vec![second, agent("coordinator")],
            ..Default::default()
        };

        let merged = merge_llm(&base, &over);
        assert_eq!(merged.agents.len(), 2);
        assert_eq!(merged.agents[0].model.as_deref(), Some("b"));
        assert_eq!(merged.agents[1].role.as_deref(), Some("coordinator"));
    }

    #[test]
    fn test_resolve_agents_applies_openai_defaults() {
        let cfg = LlmConfig {
            translator_model: Some("gpt-4o".to_string()),
            ..Default::default()
        };
        let (coordinator, translator) = resolve_agents(&cfg).unwrap();

        assert_eq!(coordinator.provider(), "openai");
        assert_eq!(coordinator.model(), None);
        assert_eq!(translator.model(), Some("gpt-4o"));
        assert_eq!(translator.base_url(), Some("https://api.openai.com/v1"));
        assert_eq!(translator.chat_completions_path(), Some("/chat/completions"));
        assert_eq!(translator.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn test_translator_inherits_from_coordinator() {
        let mut coordinator = agent("coordinator");
        coordinator.provider = Some("anthropic".to_string());
        coordinator.api_key_env = Some("MY_KEY".to_string());
        coordinator.temperature = Some(0.1);
        coordinator.headers = BTreeMap::from([
            ("X-Shared".to_string(), "c".to_string()),
            ("X-Coord".to_string(), "c".to_string()),
        ]);

        let mut translator = agent("translator");
        translator.model = Some("claude".to_string());
        translator.headers = BTreeMap::from([("X-Shared".to_string(), "t".to_string())]);

        let cfg = LlmConfig {
            agents: vec![coordinator, translator],
            ..Default::default()
        };
        let (_, translator) = resolve_agents(&cfg).unwrap();

        assert_eq!(translator.provider(), "anthropic");
        assert_eq!(translator.base_url(), Some("https://api.anthropic.com"));
        assert_eq!(translator.chat_completions_path(), Some("/v1/messages"));
        assert_eq!(translator.api_key_env.as_deref(), Some("MY_KEY"));
        assert_eq!(translator.temperature, Some(0.1));
        assert_eq!(translator.headers["X-Shared"], "t");
        assert_eq!(translator.headers["X-Coord"], "c");
    }

    #[test]
    fn test_agent_model_wins_over_top_level_model() {
        let mut translator = agent("translator");
        translator.model = Some("agent-model".to_string());
        let cfg = LlmConfig {
            translator_model: Some("top-model".to_string()),
            coordinator_model: Some("coord-model".to_string()),
            agents: vec![translator],
            ..Default::default()
        };
        let (coordinator, translator) = resolve_agents(&cfg).unwrap();
        assert_eq!(translator.model(), Some("agent-model"));
        assert_eq!(coordinator.model(), Some("coord-model"));
    }

    #[test]
    fn test_vertex_requires_explicit_endpoint() {
        let cfg = LlmConfig {
            provider: Some("vertex".to_string()),
            ..Default::default()
        };
        let (_, translator) = resolve_agents(&cfg).unwrap();
        assert_eq!(translator.chat_completions_path(), Some("/chat/completions"));
        assert_eq!(translator.base_url(), None);
        assert_eq!(translator.api_key_env, None);
    }

    #[test]
    fn test_unknown_role_is_fatal() {
        let cfg = LlmConfig {
            agents: vec![agent("reviewer")],
            ..Default::default()
        };
        let err = resolve_agents(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRole(role) if role == "reviewer"));
    }

    #[test]
    fn test_missing_role_is_fatal() {
        let cfg = LlmConfig {
            agents: vec![AgentConfig::default()],
            ..Default::default()
        };
        assert!(matches!(
            resolve_agents(&cfg).unwrap_err(),
            ConfigError::MissingRole
        ));
    }

    #[test]
    fn test_llm_table_parses_from_toml() {
        let cfg: LlmConfig = toml::from_str(
            r#"
provider = "openai"
translator_model = "gpt-4o"
timeout_seconds = 30

[headers]
"X-Team" = "docs"

[[agent]]
role = "coordinator"
model = "gpt-4o-mini"
"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_seconds, Some(30));
        assert_eq!(cfg.headers["X-Team"], "docs");
        assert_eq!(cfg.agents.len(), 1);
        assert_eq!(cfg.agents[0].model.as_deref(), Some("gpt-4o-mini"));
    }
}
