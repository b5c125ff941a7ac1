//! Configuration for WaSender — loaded from `~/.wasender/config.toml`.
//!
//! Every section has defaults, so a missing file or a partial file is fine.
//! A few values can be overridden from the environment (`PORT`,
//! `WASENDER_COUNTRY_CODE`, `WASENDER_BRIDGE_URL`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SenderError};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Messaging session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Client backend: "bridge" or "dry-run".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Base URL of the WhatsApp Web bridge.
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,
    /// Where the bridge keeps its local-auth credentials.
    #[serde(default = "default_auth_dir")]
    pub auth_dir: String,
    /// Delay between teardown and re-initialization on restart.
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    /// Upper bound for a single send call.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bridge_url: default_bridge_url(),
            auth_dir: default_auth_dir(),
            restart_delay_ms: default_restart_delay_ms(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

/// Bulk dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Country prefix applied to numbers without a chat domain.
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// Name used when a contact has none.
    #[serde(default = "default_contact_name")]
    pub default_contact_name: String,
    /// Finished jobs kept in memory for report queries.
    #[serde(default = "default_max_retained_jobs")]
    pub max_retained_jobs: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            default_contact_name: default_contact_name(),
            max_retained_jobs: default_max_retained_jobs(),
        }
    }
}

/// Attachment download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_media_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_media_max_bytes")]
    pub max_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_media_timeout_secs(),
            max_bytes: default_media_max_bytes(),
        }
    }
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 3001 }
fn default_backend() -> String { "bridge".into() }
fn default_bridge_url() -> String { "http://127.0.0.1:8085".into() }
fn default_auth_dir() -> String { "~/.wasender/auth".into() }
fn default_restart_delay_ms() -> u64 { 2000 }
fn default_send_timeout_secs() -> u64 { 30 }
fn default_country_code() -> String { "55".into() }
fn default_contact_name() -> String { "Cliente".into() }
fn default_max_retained_jobs() -> usize { 100 }
fn default_media_timeout_secs() -> u64 { 20 }
fn default_media_max_bytes() -> usize { 16 * 1024 * 1024 }

impl SenderConfig {
    /// WaSender home directory (`~/.wasender`).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wasender")
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string());
        if !expanded.exists() {
            return Err(SenderError::ConfigNotFound(expanded.display().to_string()));
        }
        let mut config = Self::read_file(&expanded)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SenderError::config(format!("Invalid config.toml: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| SenderError::config(format!("Serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `PORT`, `WASENDER_COUNTRY_CODE` and `WASENDER_BRIDGE_URL`.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.gateway.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {port}"),
            }
        }
        if let Some(code) = lookup("WASENDER_COUNTRY_CODE") {
            let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
            if !digits.is_empty() {
                self.dispatch.country_code = digits;
            }
        }
        if let Some(url) = lookup("WASENDER_BRIDGE_URL") {
            if !url.trim().is_empty() {
                self.session.bridge_url = url.trim().to_string();
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.dispatch.country_code.is_empty()
            || !self.dispatch.country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(SenderError::config(format!(
                "dispatch.country_code must be digits, got '{}'",
                self.dispatch.country_code
            )));
        }
        if !matches!(self.session.backend.as_str(), "bridge" | "dry-run") {
            return Err(SenderError::config(format!(
                "Unknown session backend: {}",
                self.session.backend
            )));
        }
        Ok(())
    }

    /// Auth directory with `~` expanded.
    pub fn auth_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.session.auth_dir).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SenderConfig::default();
        assert_eq!(config.gateway.port, 3001);
        assert_eq!(config.dispatch.country_code, "55");
        assert_eq!(config.dispatch.default_contact_name, "Cliente");
        assert_eq!(config.session.restart_delay_ms, 2000);
        assert_eq!(config.session.backend, "bridge");
    }

    #[test]
    fn test_partial_toml() {
        let config = SenderConfig::from_toml(
            r#"
            [gateway]
            port = 8080

            [dispatch]
            country_code = "351"
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.dispatch.country_code, "351");
        assert_eq!(config.media.timeout_secs, 20);
    }

    #[test]
    fn test_invalid_country_code_rejected() {
        let err = SenderConfig::from_toml("[dispatch]\ncountry_code = \"+55\"").unwrap_err();
        assert!(matches!(err, SenderError::Config(_)));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = SenderConfig::from_toml("[session]\nbackend = \"puppeteer\"").unwrap_err();
        assert!(err.to_string().contains("puppeteer"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SenderConfig::default();
        config.apply_overrides(|key| match key {
            "PORT" => Some("4000".into()),
            "WASENDER_COUNTRY_CODE" => Some("+1".into()),
            "WASENDER_BRIDGE_URL" => Some("http://bridge:9000".into()),
            _ => None,
        });
        assert_eq!(config.gateway.port, 4000);
        assert_eq!(config.dispatch.country_code, "1");
        assert_eq!(config.session.bridge_url, "http://bridge:9000");
    }

    #[test]
    fn test_invalid_port_ignored() {
        let mut config = SenderConfig::default();
        config.apply_overrides(|key| (key == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.gateway.port, 3001);
    }

    #[test]
    fn test_save_and_load_from() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = SenderConfig::default();
        config.session.backend = "dry-run".into();
        config.dispatch.max_retained_jobs = 7;
        config.save_to(&path).unwrap();

        let loaded = SenderConfig::load_from(&path).unwrap();
        assert_eq!(loaded.session.backend, "dry-run");
        assert_eq!(loaded.dispatch.max_retained_jobs, 7);
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SenderConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, SenderError::ConfigNotFound(_)));
    }
}
