//! LLM configuration loading and provider selection.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::LLMProvider;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";

/// Stored LLM configuration (`llm-config.json`), with env vars as fallback for keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// `auto`, `openai` or `groq`.
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            groq_api_key: None,
            openai_model: default_openai_model(),
            groq_model: default_groq_model(),
        }
    }
}

/// A provider chosen once at startup and injected into the agents.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
}

impl ResolvedProvider {
    /// e.g. `Using OpenAI (gpt-4o-mini)`.
    pub fn status_line(&self) -> String {
        format!("Using {} ({})", self.provider.display_name(), self.model)
    }
}

impl std::fmt::Debug for ResolvedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedProvider")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"***")
            .finish()
    }
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// Load config from file with an arbitrary variable lookup for the keys.
    pub fn load_with(config_path: &Path, var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match std::fs::read_to_string(config_path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring invalid {}: {}", config_path.display(), e);
                LLMConfig::default()
            }),
            Err(_) => LLMConfig::default(),
        };

        config.openai_api_key = non_blank(config.openai_api_key.take())
            .or_else(|| non_blank(var(LLMProvider::OpenAI.api_key_env())));
        config.groq_api_key = non_blank(config.groq_api_key.take())
            .or_else(|| non_blank(var(LLMProvider::Groq.api_key_env())));

        config
    }

    fn key_for(&self, provider: LLMProvider) -> Option<&String> {
        match provider {
            LLMProvider::OpenAI => self.openai_api_key.as_ref(),
            LLMProvider::Groq => self.groq_api_key.as_ref(),
        }
    }

    fn model_for(&self, provider: LLMProvider) -> &str {
        match provider {
            LLMProvider::OpenAI => &self.openai_model,
            LLMProvider::Groq => &self.groq_model,
        }
    }

    fn resolve_one(&self, provider: LLMProvider) -> Option<ResolvedProvider> {
        self.key_for(provider).map(|key| ResolvedProvider {
            provider,
            model: self.model_for(provider).to_string(),
            api_key: key.clone(),
        })
    }

    /// Resolve which provider and model to use. `None` selects the fallback path.
    pub fn resolve_provider(&self) -> Option<ResolvedProvider> {
        let resolved = match self.preferred_provider.as_str() {
            "openai" => self.resolve_one(LLMProvider::OpenAI),
            "groq" => self.resolve_one(LLMProvider::Groq),
            "auto" => LLMProvider::PRIORITY
                .iter()
                .find_map(|&p| self.resolve_one(p)),
            other => {
                warn!("Unknown preferred provider '{}'; no LLM configured", other);
                None
            }
        };

        match &resolved {
            Some(r) => info!("LLM provider: {} ({})", r.provider, r.model),
            None => info!("No LLM credential found; answers use the fallback template"),
        }
        resolved
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_no_keys_means_fallback() {
        let dir = TempDir::new().unwrap();
        let config = LLMConfig::load_with(&dir.path().join("llm-config.json"), env(&[]));
        assert!(config.resolve_provider().is_none());
    }

    #[test]
    fn test_openai_checked_before_groq() {
        let dir = TempDir::new().unwrap();
        let config = LLMConfig::load_with(
            &dir.path().join("llm-config.json"),
            env(&[("GROQ_API_KEY", "gsk-1"), ("OPENAI_API_KEY", "sk-1")]),
        );
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.provider, LLMProvider::OpenAI);
        assert_eq!(resolved.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(resolved.status_line(), "Using OpenAI (gpt-4o-mini)");
    }

    #[test]
    fn test_groq_when_only_groq_key() {
        let dir = TempDir::new().unwrap();
        let config = LLMConfig::load_with(
            &dir.path().join("llm-config.json"),
            env(&[("GROQ_API_KEY", "gsk-1"), ("OPENAI_API_KEY", "   ")]),
        );
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.provider, LLMProvider::Groq);
        assert_eq!(resolved.status_line(), "Using Groq (llama-3.1-8b-instant)");
    }

    #[test]
    fn test_file_overrides_env_and_preference_is_explicit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("llm-config.json");
        std::fs::write(
            &path,
            r#"{"preferred_provider": "groq", "groq_api_key": "gsk-file", "groq_model": "llama-3.3-70b-versatile"}"#,
        )
        .unwrap();

        let config = LLMConfig::load_with(&path, env(&[("OPENAI_API_KEY", "sk-env")]));
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.provider, LLMProvider::Groq);
        assert_eq!(resolved.api_key, "gsk-file");
        assert_eq!(resolved.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_debug_masks_key() {
        let resolved = ResolvedProvider {
            provider: LLMProvider::OpenAI,
            model: "gpt-4o-mini".into(),
            api_key: "sk-secret".into(),
        };
        assert!(!format!("{resolved:?}").contains("sk-secret"));
    }
}
