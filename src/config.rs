//! Configuration for the citizen assistant
//!
//! Loads configuration from config.yml file

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_STORE_URL: &str = "http://localhost:8055";
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "civic_facts";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 20;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    store: Option<StoreSection>,
    semantic: Option<SemanticSection>,
    reranker: Option<RerankerSection>,
    rate_limit: Option<RateLimitSection>,
    openai: Option<OpenAISection>,
}

#[derive(Debug, Deserialize)]
struct StoreSection {
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SemanticSection {
    enabled: Option<bool>,
    qdrant_url: Option<String>,
    collection: Option<String>,
    embedding_model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RerankerSection {
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RateLimitSection {
    max_requests: Option<u32>,
    window_secs: Option<u64>,
    rest_url: Option<String>,
    rest_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAISection {
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub store_base_url: String,
    pub store_api_key: String,
    /// Semantic tier on/off. Absent `semantic` section means off.
    pub semantic_enabled: bool,
    pub qdrant_url: String,
    pub collection: String,
    pub embedding_model: String,
    /// Empty string means the reranking stage is skipped.
    pub reranker_url: String,
    pub reranker_api_key: String,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    /// Empty string means the in-process sliding window is used.
    pub rate_limit_rest_url: String,
    pub rate_limit_rest_token: String,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub openai_temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        // If value from YAML looks like ${...}, try env var
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                // Extract var name from ${VAR_NAME}
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
                if let Ok(env_val) = std::env::var(env_key) {
                    return env_val;
                }
                // Unresolved placeholder: treat as unset rather than
                // letting the literal "${VAR}" reach an HTTP client.
                return String::new();
            }
        }
        // Also check explicit env_key as fallback
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        value.unwrap_or_default()
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        // Load .env file first
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        let store = yaml.store.unwrap_or(StoreSection {
            base_url: None,
            api_key: None,
        });

        let semantic_present = yaml.semantic.is_some();
        let semantic = yaml.semantic.unwrap_or(SemanticSection {
            enabled: None,
            qdrant_url: None,
            collection: None,
            embedding_model: None,
        });

        let reranker = yaml.reranker.unwrap_or(RerankerSection {
            base_url: None,
            api_key: None,
        });

        let rate_limit = yaml.rate_limit.unwrap_or(RateLimitSection {
            max_requests: None,
            window_secs: None,
            rest_url: None,
            rest_token: None,
        });

        let openai = yaml.openai.unwrap_or(OpenAISection {
            model: None,
            max_tokens: None,
            temperature: None,
        });

        let store_base_url = Self::resolve_env_string(store.base_url, "STORE_BASE_URL");
        let store_api_key = Self::resolve_env_string(store.api_key, "STORE_API_KEY");
        let qdrant_url = Self::resolve_env_string(semantic.qdrant_url, "QDRANT_URL");
        let reranker_url = Self::resolve_env_string(reranker.base_url, "RERANKER_URL");
        let reranker_api_key = Self::resolve_env_string(reranker.api_key, "RERANKER_API_KEY");
        let rate_limit_rest_url = Self::resolve_env_string(rate_limit.rest_url, "RATE_LIMIT_REST_URL");
        let rate_limit_rest_token =
            Self::resolve_env_string(rate_limit.rest_token, "RATE_LIMIT_REST_TOKEN");

        Ok(Self {
            store_base_url: if store_base_url.is_empty() {
                DEFAULT_STORE_URL.to_string()
            } else {
                store_base_url
            },
            store_api_key,
            semantic_enabled: semantic_present && semantic.enabled.unwrap_or(true),
            qdrant_url: if qdrant_url.is_empty() {
                DEFAULT_QDRANT_URL.to_string()
            } else {
                qdrant_url
            },
            collection: semantic
                .collection
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            embedding_model: semantic
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            reranker_url,
            reranker_api_key,
            rate_limit_max: rate_limit.max_requests.unwrap_or(DEFAULT_RATE_LIMIT_MAX),
            rate_limit_window_secs: match rate_limit.window_secs {
                Some(0) => {
                    warn!(
                        "rate_limit.window_secs must be positive, using {}",
                        DEFAULT_RATE_LIMIT_WINDOW_SECS
                    );
                    DEFAULT_RATE_LIMIT_WINDOW_SECS
                }
                Some(secs) => secs,
                None => DEFAULT_RATE_LIMIT_WINDOW_SECS,
            },
            rate_limit_rest_url,
            rate_limit_rest_token,
            openai_model: openai.model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
            openai_max_tokens: openai.max_tokens.unwrap_or(600),
            openai_temperature: openai.temperature.unwrap_or(0.3),
        })
    }

    /// Create config with empty defaults (fallback)
    /// Deployments provide config.yml with actual endpoints
    fn defaults() -> Self {
        Self {
            store_base_url: DEFAULT_STORE_URL.to_string(),
            store_api_key: String::new(),
            semantic_enabled: false,
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            reranker_url: String::new(),
            reranker_api_key: String::new(),
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            rate_limit_rest_url: String::new(),
            rate_limit_rest_token: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_max_tokens: 600,
            openai_temperature: 0.3,
        }
    }

    /// True when a reranking endpoint is configured.
    pub fn reranker_configured(&self) -> bool {
        !self.reranker_url.is_empty()
    }

    /// True when the REST rate-limit store is configured.
    pub fn rate_limit_rest_configured(&self) -> bool {
        !self.rate_limit_rest_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(value) => std::env::set_var(&self.key, value),
                None => std::env::remove_var(&self.key),
            }
        }
    }

    fn set_envs(vars: &[(&str, &str)]) -> Vec<EnvGuard> {
        vars.iter().map(|(k, v)| EnvGuard::set(k, v)).collect()
    }

    #[test]
    fn test_config_defaults_disable_optional_features() {
        let config = Config::defaults();

        assert_eq!(config.store_base_url, DEFAULT_STORE_URL);
        assert!(!config.semantic_enabled);
        assert!(!config.reranker_configured());
        assert!(!config.rate_limit_rest_configured());
        assert_eq!(config.rate_limit_max, DEFAULT_RATE_LIMIT_MAX);
        assert_eq!(config.rate_limit_window_secs, DEFAULT_RATE_LIMIT_WINDOW_SECS);
    }

    #[test]
    fn test_load_from_yaml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
store:
  base_url: "https://data.example.org"

semantic:
  qdrant_url: "http://qdrant:6334"
  collection: "civic_test"

rate_limit:
  max_requests: 5
  window_secs: 10

openai:
  model: "gpt-4o"
  max_tokens: 400
  temperature: 0.1
"#;
        let temp_file = std::env::temp_dir().join("test_config_yaml.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let config = Config::load_from_file(&temp_file).unwrap();

        assert_eq!(config.store_base_url, "https://data.example.org");
        assert!(config.semantic_enabled);
        assert_eq!(config.qdrant_url, "http://qdrant:6334");
        assert_eq!(config.collection, "civic_test");
        assert_eq!(config.rate_limit_max, 5);
        assert_eq!(config.rate_limit_window_secs, 10);
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.openai_max_tokens, 400);

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn semantic_section_can_be_explicitly_disabled() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
semantic:
  enabled: false
  qdrant_url: "http://qdrant:6334"
"#;
        let temp_file = std::env::temp_dir().join("test_config_semantic_off.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let config = Config::load_from_file(&temp_file).unwrap();
        assert!(!config.semantic_enabled);

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn missing_semantic_section_means_feature_off() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
store:
  base_url: "https://data.example.org"
"#;
        let temp_file = std::env::temp_dir().join("test_config_no_semantic.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let config = Config::load_from_file(&temp_file).unwrap();
        assert!(!config.semantic_enabled);

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn env_placeholders_are_resolved_from_environment() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
store:
  base_url: "${STORE_BASE_URL}"
  api_key: "${STORE_API_KEY}"

reranker:
  base_url: "${RERANKER_URL}"
"#;
        let temp_file = std::env::temp_dir().join("config_env_override.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let _guards = set_envs(&[
            ("STORE_BASE_URL", "https://store-from-env"),
            ("STORE_API_KEY", "key_from_env"),
            ("RERANKER_URL", "https://rerank-from-env"),
        ]);

        let config = Config::load_from_file(&temp_file).unwrap();

        assert_eq!(config.store_base_url, "https://store-from-env");
        assert_eq!(config.store_api_key, "key_from_env");
        assert_eq!(config.reranker_url, "https://rerank-from-env");
        assert!(config.reranker_configured());

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn unresolved_placeholder_falls_back_to_default_store_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        std::env::remove_var("STORE_BASE_URL");
        let yaml = r#"
store:
  base_url: "${STORE_BASE_URL}"
"#;
        let temp_file = std::env::temp_dir().join("config_unresolved_env.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let config = Config::load_from_file(&temp_file).unwrap();

        // The literal "${STORE_BASE_URL}" must never leak into the client.
        assert_eq!(config.store_base_url, DEFAULT_STORE_URL);

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn load_from_file_fails_on_missing_file() {
        let result = Config::load_from_file("/nonexistent/path/config.yml");
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file_fails_on_invalid_yaml() {
        let temp_file = std::env::temp_dir().join("config_invalid_yaml.yml");
        std::fs::write(&temp_file, "{ invalid yaml [").unwrap();

        let result = Config::load_from_file(&temp_file);
        assert!(result.is_err());

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn config_debug_trait() {
        let config = Config::defaults();
        let debug_str = format!("{:?}", config);

        assert!(debug_str.contains("Config"));
        assert!(debug_str.contains("store_base_url"));
    }

    #[test]
    fn config_clone() {
        let config = Config::defaults();
        let cloned = config.clone();

        assert_eq!(cloned.store_base_url, config.store_base_url);
        assert_eq!(cloned.rate_limit_max, config.rate_limit_max);
    }

    #[test]
    fn rest_rate_limit_store_detected_from_yaml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
rate_limit:
  max_requests: 30
  rest_url: "https://kv.example.org"
  rest_token: "secret"
"#;
        let temp_file = std::env::temp_dir().join("config_rest_limiter.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let config = Config::load_from_file(&temp_file).unwrap();

        assert!(config.rate_limit_rest_configured());
        assert_eq!(config.rate_limit_max, 30);
        assert_eq!(config.rate_limit_rest_token, "secret");

        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn zero_rate_limit_window_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        let yaml = r#"
rate_limit:
  max_requests: 5
  window_secs: 0
"#;
        let temp_file = std::env::temp_dir().join("config_zero_window.yml");
        std::fs::write(&temp_file, yaml).unwrap();

        let config = Config::load_from_file(&temp_file).unwrap();

        assert_eq!(config.rate_limit_max, 5);
        assert_eq!(config.rate_limit_window_secs, DEFAULT_RATE_LIMIT_WINDOW_SECS);

        std::fs::remove_file(temp_file).ok();
    }
}
