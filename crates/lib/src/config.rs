//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.dmrelay/config.json`) and environment.
//! Credentials are normally supplied through the environment (or a `.env` file loaded by the CLI);
//! the env value wins over the file when both are set.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Completion provider (OpenAI-compatible) settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Instagram messaging (Graph API) settings.
    #[serde(default)]
    pub instagram: InstagramConfig,
}

/// Webhook server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 5000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must reach the webhook from outside).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Completion provider config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// API base including the version segment (default "https://api.openai.com/v1").
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    /// Bearer key. Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,

    /// Model id sent with every completion (default "text-davinci-003").
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Upper bound on generated tokens (default 150).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_completion_model() -> String {
    "text-davinci-003".to_string()
}

fn default_max_tokens() -> u32 {
    150
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            api_key: None,
            model: default_completion_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Instagram messaging config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramConfig {
    /// Graph API host (default "https://graph.facebook.com").
    #[serde(default = "default_graph_api_base")]
    pub graph_api_base: String,

    /// Graph API version path segment (default "v15.0").
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Page/business access token. Overridden by INSTAGRAM_ACCESS_TOKEN env.
    pub access_token: Option<String>,

    /// Instagram business account id used in the send path. Overridden by INSTAGRAM_BUSINESS_ID env.
    pub business_id: Option<String>,

    /// Secret compared against `hub.verify_token` during subscription. Overridden by VERIFY_TOKEN env.
    pub verify_token: Option<String>,
}

fn default_graph_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_api_version() -> String {
    "v15.0".to_string()
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            graph_api_base: default_graph_api_base(),
            api_version: default_api_version(),
            access_token: None,
            business_id: None,
            verify_token: None,
        }
    }
}

impl CompletionConfig {
    /// Configured API key, trimmed; None when unset or blank. Does not read the environment.
    pub fn api_key(&self) -> Option<String> {
        config_value(self.api_key.as_ref())
    }
}

impl InstagramConfig {
    /// Configured access token, trimmed; None when unset or blank.
    pub fn access_token(&self) -> Option<String> {
        config_value(self.access_token.as_ref())
    }

    /// Configured business id, trimmed; None when unset or blank.
    pub fn business_id(&self) -> Option<String> {
        config_value(self.business_id.as_ref())
    }

    /// Configured verification secret, trimmed; None when unset or blank.
    pub fn verify_token(&self) -> Option<String> {
        config_value(self.verify_token.as_ref())
    }
}

/// Non-empty trimmed env value.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Non-empty trimmed config value.
fn config_value(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the completion API key: env OPENAI_API_KEY overrides config.
pub fn resolve_completion_api_key(config: &Config) -> Option<String> {
    env_value("OPENAI_API_KEY").or_else(|| config.completion.api_key())
}

/// Resolve the Instagram access token: env INSTAGRAM_ACCESS_TOKEN overrides config.
pub fn resolve_instagram_access_token(config: &Config) -> Option<String> {
    env_value("INSTAGRAM_ACCESS_TOKEN").or_else(|| config.instagram.access_token())
}

/// Resolve the Instagram business id: env INSTAGRAM_BUSINESS_ID overrides config.
pub fn resolve_instagram_business_id(config: &Config) -> Option<String> {
    env_value("INSTAGRAM_BUSINESS_ID").or_else(|| config.instagram.business_id())
}

/// Resolve the webhook verification secret: env VERIFY_TOKEN overrides config.
pub fn resolve_verify_token(config: &Config) -> Option<String> {
    env_value("VERIFY_TOKEN").or_else(|| config.instagram.verify_token())
}

/// Resolve the listen port: env PORT overrides config when it parses as a port number.
pub fn resolve_port(config: &Config) -> u16 {
    match env_value("PORT") {
        Some(p) => match p.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                log::warn!("ignoring invalid PORT value: {}", p);
                config.gateway.port
            }
        },
        None => config.gateway.port,
    }
}

/// Apply environment overrides so downstream components see a single resolved config.
/// This is the only place the environment is consulted; components read the fields they are given.
pub fn apply_env_overrides(mut config: Config) -> Config {
    config.gateway.port = resolve_port(&config);
    config.completion.api_key = resolve_completion_api_key(&config);
    config.instagram.access_token = resolve_instagram_access_token(&config);
    config.instagram.business_id = resolve_instagram_business_id(&config);
    config.instagram.verify_token = resolve_verify_token(&config);
    config
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("DMRELAY_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".dmrelay").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, DMRELAY_CONFIG_PATH, or the default. Missing file => default config.
/// Returns the config and the path that was used. Env overrides are not applied here.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Serializes tests that mutate process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Run `f` with the given env vars set (Some) or removed (None), restoring them afterwards.
#[cfg(test)]
pub(crate) fn with_env<T>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(k, _)| (k.to_string(), std::env::var(k).ok()))
        .collect();
    for (k, v) in vars {
        match v {
            Some(v) => std::env::set_var(k, v),
            None => std::env::remove_var(k),
        }
    }
    let out = f();
    for (k, v) in saved {
        match v {
            Some(v) => std::env::set_var(&k, v),
            None => std::env::remove_var(&k),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 5000);
        assert_eq!(g.bind, "0.0.0.0");
    }

    #[test]
    fn empty_object_parses_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.completion.model, "text-davinci-003");
        assert_eq!(config.completion.max_tokens, 150);
        assert_eq!(config.instagram.api_version, "v15.0");
        assert_eq!(config.instagram.graph_api_base, "https://graph.facebook.com");
        assert!(config.instagram.verify_token.is_none());
    }

    #[test]
    fn camel_case_keys_are_read() {
        let config: Config = serde_json::from_str(
            r#"{
                "gateway": { "port": 8080 },
                "completion": { "maxTokens": 64, "apiKey": "sk-test" },
                "instagram": { "businessId": "1784", "verifyToken": "hush" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.bind, "0.0.0.0");
        assert_eq!(config.completion.max_tokens, 64);
        assert_eq!(config.completion.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.instagram.business_id.as_deref(), Some("1784"));
        assert_eq!(config.instagram.verify_token.as_deref(), Some("hush"));
    }

    #[test]
    fn blank_config_values_resolve_to_none() {
        assert_eq!(config_value(Some(&"   ".to_string())), None);
        assert_eq!(config_value(Some(&" tok ".to_string())), Some("tok".to_string()));
        assert_eq!(config_value(None), None);
    }

    #[test]
    fn load_config_missing_file_uses_defaults() {
        let path = std::env::temp_dir()
            .join(format!("dmrelay-missing-{}", std::process::id()))
            .join("config.json");
        let (config, used) = load_config(Some(path.clone())).unwrap();
        assert_eq!(used, path);
        assert_eq!(config.gateway.port, 5000);
    }

    #[test]
    fn port_env_wins_only_when_it_parses() {
        let mut config = Config::default();
        config.gateway.port = 7000;
        with_env(&[("PORT", Some(" 8081 "))], || {
            assert_eq!(resolve_port(&config), 8081);
        });
        with_env(&[("PORT", Some("eighty"))], || {
            assert_eq!(resolve_port(&config), 7000);
        });
        with_env(&[("PORT", Some("70000"))], || {
            assert_eq!(resolve_port(&config), 7000);
        });
        with_env(&[("PORT", Some(""))], || {
            assert_eq!(resolve_port(&config), 7000);
        });
        with_env(&[("PORT", None)], || {
            assert_eq!(resolve_port(&Config::default()), 5000);
        });
    }

    #[test]
    fn verify_token_env_set_empty_and_unset() {
        let mut config = Config::default();
        config.instagram.verify_token = Some(" from-file ".to_string());
        with_env(&[("VERIFY_TOKEN", Some(" from-env "))], || {
            assert_eq!(resolve_verify_token(&config).as_deref(), Some("from-env"));
        });
        with_env(&[("VERIFY_TOKEN", Some("   "))], || {
            assert_eq!(resolve_verify_token(&config).as_deref(), Some("from-file"));
        });
        with_env(&[("VERIFY_TOKEN", None)], || {
            assert_eq!(resolve_verify_token(&config).as_deref(), Some("from-file"));
            assert_eq!(resolve_verify_token(&Config::default()), None);
        });
    }

    #[test]
    fn apply_env_overrides_resolves_every_field_once() {
        let mut config = Config::default();
        config.gateway.port = 7000;
        config.completion.api_key = Some("sk-file".to_string());
        config.instagram.access_token = Some("  ".to_string());
        config.instagram.business_id = Some("biz-file".to_string());
        config.instagram.verify_token = Some("hush".to_string());
        let resolved = with_env(
            &[
                ("PORT", Some("9090")),
                ("OPENAI_API_KEY", Some("sk-env")),
                ("INSTAGRAM_ACCESS_TOKEN", Some("page-env")),
                ("INSTAGRAM_BUSINESS_ID", None),
                ("VERIFY_TOKEN", Some("")),
            ],
            || apply_env_overrides(config),
        );
        assert_eq!(resolved.gateway.port, 9090);
        assert_eq!(resolved.completion.api_key.as_deref(), Some("sk-env"));
        assert_eq!(resolved.instagram.access_token.as_deref(), Some("page-env"));
        assert_eq!(resolved.instagram.business_id.as_deref(), Some("biz-file"));
        assert_eq!(resolved.instagram.verify_token.as_deref(), Some("hush"));
    }

    #[test]
    fn section_accessors_ignore_environment() {
        let mut config = Config::default();
        config.instagram.verify_token = Some("hush".to_string());
        config.completion.api_key = Some(" ".to_string());
        with_env(
            &[("VERIFY_TOKEN", Some("from-env")), ("OPENAI_API_KEY", Some("sk-env"))],
            || {
                assert_eq!(config.instagram.verify_token().as_deref(), Some("hush"));
                assert_eq!(config.completion.api_key(), None);
            },
        );
    }
}
