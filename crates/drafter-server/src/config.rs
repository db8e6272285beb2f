//! `drafter.toml`: model endpoint, session defaults, audit log, HTTP bind.

use anyhow::Context;
use drafter_core::{AuditConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrafterConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub audit: AuditSettings,
    #[serde(default)]
    pub server: ServerConfig,
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL including the version prefix, e.g. `https://api.mistral.ai/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Per-request HTTP timeout. The session applies the same bound per call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_sampling")]
    pub temperature: f32,
    #[serde(default = "default_sampling")]
    pub top_p: f32,
}

fn default_base_url() -> String {
    "https://api.mistral.ai/v1".into()
}

fn default_model() -> String {
    "mistral-medium-latest".into()
}

fn default_api_key_env() -> String {
    "DRAFTER_API_KEY".into()
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_max_retries() -> u32 {
    2
}

fn default_sampling() -> f32 {
    0.1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            temperature: default_sampling(),
            top_p: default_sampling(),
        }
    }
}

impl ModelConfig {
    /// API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_true")]
    pub skip_drawings: bool,
    /// Names the database file and the audit run log.
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_session_id() -> String {
    "default".into()
}

fn default_true() -> bool {
    true
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            skip_drawings: true,
            session_id: default_session_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_prompt_preview")]
    pub prompt_preview_chars: usize,
    #[serde(default = "default_response_preview")]
    pub response_preview_chars: usize,
    #[serde(default = "default_true")]
    pub capture_artifacts: bool,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_prompt_preview() -> usize {
    3000
}

fn default_response_preview() -> usize {
    5000
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: default_log_dir(),
            prompt_preview_chars: default_prompt_preview(),
            response_preview_chars: default_response_preview(),
            capture_artifacts: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:9191".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl DrafterConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }

    /// Load `path` if it exists, otherwise defaults. A file that exists but
    /// fails to parse is reported and replaced by defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{:#}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Problems that would make the config unusable. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.model.base_url.trim().is_empty() {
            errors.push("[model] base_url must not be empty".to_string());
        } else if !self.model.base_url.starts_with("http://")
            && !self.model.base_url.starts_with("https://")
        {
            errors.push(format!(
                "[model] base_url must start with http:// or https:// (got {:?})",
                self.model.base_url
            ));
        }
        if self.model.model.trim().is_empty() {
            errors.push("[model] model must not be empty".to_string());
        }
        if self.model.timeout_secs == 0 {
            errors.push("[model] timeout_secs must be greater than 0".to_string());
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            errors.push("[model] temperature must be within 0.0..=2.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            errors.push("[model] top_p must be within 0.0..=1.0".to_string());
        }
        let id = &self.session.session_id;
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            errors.push(format!(
                "[session] session_id must be non-empty ASCII letters, digits, '-' or '_' (got {:?})",
                id
            ));
        }
        if self.audit.prompt_preview_chars == 0 || self.audit.response_preview_chars == 0 {
            errors.push("[audit] preview limits must be greater than 0".to_string());
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            errors.push(format!("[server] bind is not a socket address: {:?}", self.server.bind));
        }
        errors
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, session: Option<String>) -> Self {
        if let Some(dir) = data_dir {
            self.session.data_dir = dir;
        }
        if let Some(id) = session {
            self.session.session_id = id;
        }
        self
    }

    pub fn db_path(&self) -> PathBuf {
        self.session
            .data_dir
            .join(format!("{}.redb", self.session.session_id))
    }

    pub fn audit_config(&self) -> AuditConfig {
        let audit = AuditConfig::new()
            .with_log_dir(&self.audit.log_dir)
            .with_preview_limits(
                self.audit.prompt_preview_chars,
                self.audit.response_preview_chars,
            )
            .with_artifacts(self.audit.capture_artifacts);
        if self.audit.enabled {
            audit
        } else {
            AuditConfig {
                enabled: false,
                ..audit
            }
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new()
            .with_skip_drawings(self.session.skip_drawings)
            .with_model_timeout(Duration::from_secs(self.model.timeout_secs))
            .with_audit(self.audit_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DrafterConfig::default();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        assert!(config.session.skip_drawings);
        assert_eq!(config.db_path(), PathBuf::from("./data/default.redb"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = DrafterConfig::from_toml(
            r#"
            [model]
            model = "qwen-plus"

            [session]
            skip_drawings = false
            session_id = "case-42"
            "#,
        )
        .unwrap();
        assert_eq!(config.model.model, "qwen-plus");
        assert_eq!(config.model.base_url, "https://api.mistral.ai/v1");
        assert_eq!(config.model.api_key_env, "DRAFTER_API_KEY");
        assert!(!config.session.skip_drawings);
        assert_eq!(config.db_path(), PathBuf::from("./data/case-42.redb"));
        assert_eq!(config.server.bind, "127.0.0.1:9191");
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut config = DrafterConfig::default();
        config.model.base_url = "ftp://x".into();
        config.model.timeout_secs = 0;
        config.session.session_id = "a/b".into();
        config.server.bind = "nowhere".into();
        let errors = config.validate();
        assert_eq!(errors.len(), 4, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("base_url")));
        assert!(errors.iter().any(|e| e.contains("session_id")));
    }

    #[test]
    fn test_session_config_mirrors_settings() {
        let mut config = DrafterConfig::default();
        config.audit.enabled = false;
        config.model.timeout_secs = 30;
        let session = config.session_config();
        assert_eq!(session.model_timeout, Duration::from_secs(30));
        assert!(!session.audit.enabled);
        assert!(session.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = DrafterConfig::default()
            .with_overrides(Some(PathBuf::from("/tmp/d")), Some("s1".into()));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/d/s1.redb"));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = DrafterConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[model]"));
        let back = DrafterConfig::from_toml(&text).unwrap();
        assert_eq!(back.model.model, config.model.model);
    }
}
