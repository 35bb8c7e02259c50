//! Backend configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use exam_insight_core::traits::TextBackend;

use crate::gemini::GeminiBackend;
use crate::mock::{MockBackend, DEFAULT_MOCK_REPLY};
use crate::ollama::OllamaBackend;
use crate::openai::OpenAiBackend;

/// Configuration for a single text backend.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    Mock {
        #[serde(default)]
        response: Option<String>,
        #[serde(default)]
        fail: bool,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock { response, fail } => f
                .debug_struct("Mock")
                .field("response", response)
                .field("fail", fail)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Top-level exam-insight configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamInsightConfig {
    /// Backend configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Backend used when none is named on the command line.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Upper bound on one backend call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Max concurrent analyses in a batch.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// JSON Lines file that finished analyses are appended to.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Replaces the built-in system prompt when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_timeout() -> u64 {
    60
}
fn default_parallelism() -> usize {
    4
}
fn default_store_path() -> PathBuf {
    PathBuf::from("./exam-insight-data/analyses.jsonl")
}

impl Default for ExamInsightConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
            parallelism: default_parallelism(),
            store_path: default_store_path(),
            system_prompt: None,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
        ProviderConfig::Mock { .. } => config.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `exam-insight.toml` in the current directory
/// 2. `~/.config/exam-insight/config.toml`
///
/// Environment variable overrides: `EXAM_INSIGHT_GEMINI_KEY`, `EXAM_INSIGHT_OPENAI_KEY`.
pub fn load_config() -> Result<ExamInsightConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExamInsightConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("exam-insight.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ExamInsightConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExamInsightConfig::default(),
    };

    apply_env_overrides(&mut config);

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    Ok(config)
}

fn apply_env_overrides(config: &mut ExamInsightConfig) {
    if let Ok(key) = std::env::var("EXAM_INSIGHT_GEMINI_KEY") {
        let entry = config
            .providers
            .entry("gemini".into())
            .or_insert(ProviderConfig::Gemini {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Gemini { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Ok(key) = std::env::var("EXAM_INSIGHT_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("exam-insight"))
}

/// Create a backend instance from its configuration.
pub fn create_provider(
    config: &ProviderConfig,
    timeout_secs: u64,
) -> Result<Box<dyn TextBackend>> {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => Ok(Box::new(GeminiBackend::new(
            api_key,
            base_url.clone(),
            timeout_secs,
        )?)),
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Ok(Box::new(OpenAiBackend::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
            timeout_secs,
        )?)),
        ProviderConfig::Ollama { base_url } => {
            Ok(Box::new(OllamaBackend::new(base_url, timeout_secs)?))
        }
        ProviderConfig::Mock { fail: true, .. } => Ok(Box::new(MockBackend::failing())),
        ProviderConfig::Mock {
            response,
            fail: false,
        } => Ok(Box::new(MockBackend::with_fixed_response(
            response.as_deref().unwrap_or(DEFAULT_MOCK_REPLY),
        ))),
    }
}

/// Look up a backend by name and build it.
///
/// `mock` is always available even when not configured.
pub fn create_named_provider(
    config: &ExamInsightConfig,
    name: &str,
) -> Result<Box<dyn TextBackend>> {
    match config.providers.get(name) {
        Some(provider) => create_provider(provider, config.timeout_secs),
        None if name == "mock" => Ok(Box::new(MockBackend::default())),
        None => anyhow::bail!(
            "provider '{name}' is not configured. Add a [providers.{name}] section to exam-insight.toml"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_EXAM_INSIGHT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_EXAM_INSIGHT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_EXAM_INSIGHT_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_EXAM_INSIGHT_UNSET_VAR}"), "");
        assert_eq!(resolve_env_vars("no ${closing"), "no ${closing");
        std::env::remove_var("_EXAM_INSIGHT_TEST_VAR");
    }

    #[test]
    fn resolved_values_are_not_expanded_again() {
        std::env::set_var("_EXAM_INSIGHT_SELF_REF", "${_EXAM_INSIGHT_SELF_REF}");
        assert_eq!(
            resolve_env_vars("key=${_EXAM_INSIGHT_SELF_REF}!"),
            "key=${_EXAM_INSIGHT_SELF_REF}!"
        );
        std::env::remove_var("_EXAM_INSIGHT_SELF_REF");
    }

    #[test]
    fn default_config() {
        let config = ExamInsightConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.default_model, "gemini-1.5-pro");
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.parallelism, 4);
    }

    #[test]
    fn parse_provider_config() {
        let toml_str = r#"
default_provider = "ollama"
default_model = "llama3.1:8b"
timeout_secs = 30

[providers.gemini]
type = "gemini"
api_key = "g-test"

[providers.openai]
type = "openai"
api_key = "sk-openai"

[providers.ollama]
type = "ollama"

[providers.mock]
type = "mock"
fail = true
"#;
        let config: ExamInsightConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.providers.len(), 4);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_tokens, 1024);
        assert!(matches!(
            config.providers.get("ollama"),
            Some(ProviderConfig::Ollama { base_url }) if base_url == "http://localhost:11434"
        ));
        assert!(matches!(
            config.providers.get("mock"),
            Some(ProviderConfig::Mock { fail: true, response: None })
        ));
    }

    #[test]
    fn debug_masks_api_keys() {
        let config = ProviderConfig::Gemini {
            api_key: "super-secret".into(),
            base_url: None,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn load_explicit_file_resolves_env() {
        std::env::set_var("_EXAM_INSIGHT_CFG_KEY", "from-env");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exam-insight.toml");
        std::fs::write(
            &path,
            r#"
[providers.gemini]
type = "gemini"
api_key = "${_EXAM_INSIGHT_CFG_KEY}"
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        match config.providers.get("gemini") {
            Some(ProviderConfig::Gemini { api_key, .. }) => {
                // EXAM_INSIGHT_GEMINI_KEY, when set in the environment, wins.
                if std::env::var("EXAM_INSIGHT_GEMINI_KEY").is_err() {
                    assert_eq!(api_key, "from-env");
                }
            }
            other => panic!("unexpected provider config: {other:?}"),
        }
        std::env::remove_var("_EXAM_INSIGHT_CFG_KEY");
    }

    #[test]
    fn missing_explicit_file_fails() {
        let err = load_config_from(Some(Path::new("/nonexistent/exam-insight.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[tokio::test]
    async fn named_provider_lookup() {
        let config = ExamInsightConfig::default();
        let backend = create_named_provider(&config, "mock").unwrap();
        assert_eq!(backend.name(), "mock");

        let err = create_named_provider(&config, "openai").err().unwrap();
        assert!(err.to_string().contains("not configured"));
    }
}
