//! Service configuration loaded from `.env`, plus the user-level
//! `user_config.toml` that carries the LLM API key for local deployments.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | BREEZI_DATA_PATH | ./data/breezi_store | Sled database location. |
//! | BREEZI_LLM_TIMEOUT_SECS | 10 | Hard timeout for any LLM call (routing + replies). |
//! | BREEZI_LLM_ROUTING_ENABLED | true | Try LLM routing in group chats before keyword scoring. |
//! | BREEZI_RETENTION_DAYS | 365 | Legal hold before anonymize/delete. |
//! | BREEZI_ADMIN_ID | admin | Admin id stamped on processed reports when none supplied. |

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

/// Runtime configuration for the core and gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreeziConfig {
    #[serde(default = "default_data_path")]
    pub data_path: String,
    /// Timeout budget for a single LLM call, in seconds. A timed-out routing
    /// call falls through to keyword scoring; the in-flight request is not
    /// cancelled, just abandoned.
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub llm_routing_enabled: bool,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_admin_id")]
    pub admin_id: String,
}

fn default_data_path() -> String {
    "./data/breezi_store".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    10
}

fn default_retention_days() -> i64 {
    365
}

fn default_admin_id() -> String {
    "admin".to_string()
}

impl Default for BreeziConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            llm_timeout_secs: default_llm_timeout_secs(),
            llm_routing_enabled: true,
            retention_days: default_retention_days(),
            admin_id: default_admin_id(),
        }
    }
}

impl BreeziConfig {
    /// Load from environment. Unset or invalid values fall back to defaults.
    pub fn from_env() -> Self {
        Self {
            data_path: env_string("BREEZI_DATA_PATH", default_data_path()),
            llm_timeout_secs: env_parse("BREEZI_LLM_TIMEOUT_SECS", default_llm_timeout_secs()),
            llm_routing_enabled: env_bool("BREEZI_LLM_ROUTING_ENABLED", true),
            retention_days: env_parse("BREEZI_RETENTION_DAYS", default_retention_days()),
            admin_id: env_string("BREEZI_ADMIN_ID", default_admin_id()),
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => v.trim().eq_ignore_ascii_case("true") || (v.trim().is_empty() && default),
        Err(_) => default,
    }
}

fn env_string(name: &str, default: String) -> String {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

// -----------------------------------------------------------------------------
// User configuration (API keys, model choice) stored in user_config.toml
// -----------------------------------------------------------------------------

/// User-specific configuration stored in `user_config.toml`, so self-hosted
/// deployments can provide an OpenAI-compatible key without editing the
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default)]
    pub llm_api_url: Option<String>,
}

impl UserConfig {
    pub fn default_path() -> PathBuf {
        PathBuf::from("user_config.toml")
    }

    /// Load from the default path; a missing file yields the empty config
    /// (env vars then take over).
    pub fn load() -> Self {
        Self::load_from_path(&Self::default_path()).unwrap_or_default()
    }

    pub fn load_from_path(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    /// API key priority: user_config.toml > OPENAI_API_KEY env var.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn get_llm_model(&self) -> Option<String> {
        self.llm_model
            .clone()
            .or_else(|| std::env::var("BREEZI_LLM_MODEL").ok())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn get_llm_api_url(&self) -> Option<String> {
        self.llm_api_url
            .clone()
            .or_else(|| std::env::var("BREEZI_LLM_API_URL").ok())
            .filter(|s| !s.trim().is_empty())
    }
}
