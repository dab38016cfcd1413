//! Environment-driven configuration

use std::env;

use crate::{Error, Result};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-06-01";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama2";

/// Load `.env` from the working directory, falling back to `go-agent/.env`.
///
/// A missing file is not an error: the process environment still applies.
pub fn load_env() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment variables"),
        Err(_) => match dotenvy::from_filename("go-agent/.env") {
            Ok(path) => tracing::info!(path = %path.display(), "loaded environment variables"),
            Err(err) => tracing::warn!(%err, "no .env file found, using process environment"),
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub by_azure: bool,
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

/// Which provider backs the demos' chat model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelConfig {
    OpenAi(OpenAiConfig),
    Ollama(OllamaConfig),
}

impl ModelConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes `std::env`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        match get("MODEL_TYPE").as_deref().unwrap_or("openai") {
            "openai" => {
                let api_key = get("OPENAI_API_KEY")
                    .ok_or_else(|| Error::config("OPENAI_API_KEY is not set"))?;
                let model = get("OPENAI_MODEL_NAME")
                    .ok_or_else(|| Error::config("OPENAI_MODEL_NAME is not set"))?;
                Ok(ModelConfig::OpenAi(OpenAiConfig {
                    api_key,
                    model,
                    base_url: get("OPENAI_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                    by_azure: get("OPENAI_BY_AZURE").as_deref() == Some("true"),
                    api_version: get("OPENAI_API_VERSION")
                        .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
                }))
            }
            "ollama" => Ok(ModelConfig::Ollama(OllamaConfig {
                base_url: get("OLLAMA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
                model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
            })),
            other => Err(Error::config(format!("unknown MODEL_TYPE `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn openai_is_default_and_needs_key() {
        let err = ModelConfig::from_lookup(lookup(&[("OPENAI_MODEL_NAME", "gpt-4o")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let cfg = ModelConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL_NAME", "gpt-4o"),
        ]))
        .unwrap();
        match cfg {
            ModelConfig::OpenAi(c) => {
                assert_eq!(c.base_url, DEFAULT_OPENAI_BASE_URL);
                assert!(!c.by_azure);
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn azure_flag_and_ollama_defaults() {
        let cfg = ModelConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "k"),
            ("OPENAI_MODEL_NAME", "gpt-4o"),
            ("OPENAI_BY_AZURE", "true"),
        ]))
        .unwrap();
        assert!(matches!(cfg, ModelConfig::OpenAi(OpenAiConfig { by_azure: true, .. })));

        let cfg = ModelConfig::from_lookup(lookup(&[("MODEL_TYPE", "ollama")])).unwrap();
        assert_eq!(cfg, ModelConfig::Ollama(OllamaConfig::default()));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(ModelConfig::from_lookup(lookup(&[("MODEL_TYPE", "gemini")])).is_err());
    }
}
