//! Process-wide tutor configuration.
//!
//! Loaded once at start-up and shared immutably (`Arc<TutorConfig>`). Sources, lowest to
//! highest precedence:
//!
//! | Source | Example |
//! |--------|---------|
//! | built-in defaults | see [`TutorConfig::defaults`] |
//! | TOML file at `NEURO_TUTOR_CONFIG` (default `config/neuro_tutor.toml`, optional) | `port = 9000` |
//! | `NEURO_TUTOR__*` environment | `NEURO_TUTOR__DEFAULT_MAX_TOKENS=800` |
//! | bare provider variables | `OPENROUTER_API_KEY`, `DEFAULT_MODEL` |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/neuro_tutor.toml";
pub const ENV_PREFIX: &str = "NEURO_TUTOR";

/// Value shipped in `.env.example`; treated the same as a missing key.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_OPENROUTER_API_KEY_HERE";
const PLACEHOLDER_API_KEYS: &[&str] = &[PLACEHOLDER_API_KEY, "your-openrouter-api-key-here"];

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:5177",
    "http://localhost:5180",
    "http://localhost:3000",
];

/// True when `key` is usable as a bearer credential (non-blank, not a placeholder).
pub fn is_configured_key(key: &str) -> bool {
    let k = key.trim();
    !k.is_empty() && !PLACEHOLDER_API_KEYS.contains(&k)
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    pub app_name: String,
    pub app_version: String,
    #[serde(default)]
    pub debug: bool,

    pub host: String,
    pub port: u16,
    /// Prefix under which the chat router is nested (e.g. "/api").
    pub api_prefix: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// SQLite file for sessions and messages.
    pub database_path: String,

    /// OpenAI-compatible base URL; requests go to `{api_base_url}/chat/completions`.
    pub api_base_url: String,
    pub api_key: String,
    pub default_model: String,
    pub default_temperature: f32,
    pub default_max_tokens: u32,
    pub request_timeout_secs: u64,
    /// Sent as `HTTP-Referer` (OpenRouter attribution).
    pub http_referer: String,
    /// Sent as `X-Title`.
    pub app_title: String,
}

impl std::fmt::Debug for TutorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorConfig")
            .field("app_name", &self.app_name)
            .field("app_version", &self.app_version)
            .field("debug", &self.debug)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_prefix", &self.api_prefix)
            .field("cors_origins", &self.cors_origins)
            .field("database_path", &self.database_path)
            .field("api_base_url", &self.api_base_url)
            .field("api_key", &self.masked_api_key())
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl TutorConfig {
    /// Built-in defaults, no file or environment applied.
    pub fn defaults() -> Self {
        Self {
            app_name: "Neuro Tutor API".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            debug: false,
            host: "127.0.0.1".to_string(),
            port: 8000,
            api_prefix: "/api".to_string(),
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            database_path: "./data/neuro_tutor.sqlite".to_string(),
            api_base_url: OPENROUTER_API_BASE.to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_temperature: 0.7,
            default_max_tokens: 1000,
            request_timeout_secs: 30,
            http_referer: "https://neurotutor.local".to_string(),
            app_title: "NeuroTutor-Dev".to_string(),
        }
    }

    /// Load from the process environment and the optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("NEURO_TUTOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_with(Path::new(&path), &env)
    }

    /// Load from an explicit file path and environment map (the file may be absent).
    pub fn load_with(path: &Path, env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let d = Self::defaults();
        let builder = config::Config::builder()
            .set_default("app_name", d.app_name)?
            .set_default("app_version", d.app_version)?
            .set_default("debug", d.debug)?
            .set_default("host", d.host)?
            .set_default("port", i64::from(d.port))?
            .set_default("api_prefix", d.api_prefix)?
            .set_default("cors_origins", d.cors_origins)?
            .set_default("database_path", d.database_path)?
            .set_default("api_base_url", d.api_base_url)?
            .set_default("api_key", d.api_key)?
            .set_default("default_model", d.default_model)?
            .set_default("default_temperature", f64::from(d.default_temperature))?
            .set_default("default_max_tokens", i64::from(d.default_max_tokens))?
            .set_default("request_timeout_secs", d.request_timeout_secs as i64)?
            .set_default("http_referer", d.http_referer)?
            .set_default("app_title", d.app_title)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins")
                    .source(Some(env.clone())),
            )
            .set_override_option("api_key", env_opt_string(env, "OPENROUTER_API_KEY"))?
            .set_override_option("default_model", env_opt_string(env, "DEFAULT_MODEL"))?
            .build()?;

        let cfg: TutorConfig = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "request_timeout_secs",
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.default_max_tokens == 0 {
            return Err(ConfigError::Invalid {
                key: "default_max_tokens",
                reason: "must be positive".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::Invalid {
                key: "default_temperature",
                reason: format!("{} is outside 0.0..=2.0", self.default_temperature),
            });
        }
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "default_model",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn api_key_configured(&self) -> bool {
        is_configured_key(&self.api_key)
    }

    /// At most the first 10 characters of the key, for diagnostics.
    pub fn masked_api_key(&self) -> String {
        if !self.api_key_configured() {
            return "<not configured>".to_string();
        }
        let prefix: String = self.api_key.trim().chars().take(10).collect();
        format!("{}… ({} chars)", prefix, self.api_key.trim().chars().count())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_opt_string(env: &HashMap<String, String>, name: &str) -> Option<String> {
    env.get(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn missing_file() -> std::path::PathBuf {
        std::path::PathBuf::from("definitely/not/here/neuro_tutor.toml")
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let cfg = TutorConfig::load_with(&missing_file(), &HashMap::new()).unwrap();
        assert_eq!(cfg.app_name, "Neuro Tutor API");
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.api_prefix, "/api");
        assert_eq!(cfg.default_model, DEFAULT_MODEL);
        assert_eq!(cfg.default_max_tokens, 1000);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.cors_origins.len(), 5);
        assert!(!cfg.api_key_configured());
    }

    #[test]
    fn file_then_env_then_bare_provider_vars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neuro_tutor.toml");
        std::fs::write(
            &path,
            "port = 9000\ndefault_max_tokens = 500\ndefault_model = \"from-file\"\n",
        )
        .unwrap();

        let cfg = TutorConfig::load_with(
            &path,
            &env(&[
                ("NEURO_TUTOR__DEFAULT_MAX_TOKENS", "800"),
                ("NEURO_TUTOR__CORS_ORIGINS", "http://a.test,http://b.test"),
                ("DEFAULT_MODEL", "openai/gpt-4o-mini"),
                ("OPENROUTER_API_KEY", "sk-or-v1-abcdef123456"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.default_max_tokens, 800);
        assert_eq!(cfg.default_model, "openai/gpt-4o-mini");
        assert_eq!(cfg.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(cfg.api_key_configured());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = TutorConfig::load_with(
            &missing_file(),
            &env(&[("NEURO_TUTOR__REQUEST_TIMEOUT_SECS", "0")]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "request_timeout_secs",
                ..
            }
        ));
    }

    #[test]
    fn placeholder_and_blank_keys_are_unconfigured() {
        assert!(!is_configured_key(""));
        assert!(!is_configured_key("   "));
        assert!(!is_configured_key(PLACEHOLDER_API_KEY));
        assert!(!is_configured_key("your-openrouter-api-key-here"));
        assert!(is_configured_key("sk-or-v1-real"));
    }

    #[test]
    fn debug_output_masks_the_key() {
        let cfg = TutorConfig {
            api_key: "sk-or-v1-0123456789abcdef".to_string(),
            ..TutorConfig::defaults()
        };
        let dbg = format!("{:?}", cfg);
        assert!(dbg.contains("sk-or-v1-0"));
        assert!(!dbg.contains("0123456789abcdef"));
    }
}
