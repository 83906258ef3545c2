// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::infra::paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identifying User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub xml: XmlConfig,

    #[serde(default)]
    pub esi: EsiConfig,

    #[serde(default)]
    pub sso: SsoConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub updater: UpdaterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            xml: XmlConfig::default(),
            esi: EsiConfig::default(),
            sso: SsoConfig::default(),
            cache: CacheConfig::default(),
            updater: UpdaterConfig::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("eveapi/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.eveonline.com".into(),
            timeout_seconds: 60,
        }
    }
}

impl XmlConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EsiConfig {
    pub base_url: String,
    pub datasource: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

impl Default for EsiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://esi.evetech.net".into(),
            datasource: "tranquility".into(),
            timeout_seconds: 60,
            max_retries: 3,
        }
    }
}

impl EsiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SsoConfig {
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            token_url: "https://login.eveonline.com/v2/oauth/token".into(),
            client_id: None,
            client_secret: None,
        }
    }
}

impl SsoConfig {
    /// Client credentials, if both halves are configured.
    pub fn client_credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub interval_minutes: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 30,
        }
    }
}

impl UpdaterConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.xml.base_url, "https://api.eveonline.com");
        assert_eq!(c.xml.timeout_seconds, 60);
        assert_eq!(c.esi.datasource, "tranquility");
        assert_eq!(c.esi.max_retries, 3);
        assert!(c.cache.enabled);
        assert_eq!(c.updater.interval_minutes, 30);
        assert!(c.user_agent.starts_with("eveapi/"));
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.esi.base_url, "https://esi.evetech.net");
        assert!(config.sso.client_id.is_none());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
user_agent = "my-corp-tools (admin@example.com)"

[xml]
base_url = "https://xml.example.com"
timeout_seconds = 30

[esi]
base_url = "https://esi.example.com"
datasource = "singularity"
timeout_seconds = 20
max_retries = 5

[sso]
client_id = "abc"
client_secret = "def"

[cache]
enabled = false

[updater]
interval_minutes = 15
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.user_agent, "my-corp-tools (admin@example.com)");
        assert_eq!(config.xml.timeout(), Duration::from_secs(30));
        assert_eq!(config.esi.datasource, "singularity");
        assert_eq!(config.esi.max_retries, 5);
        assert_eq!(config.sso.client_credentials(), Some(("abc", "def")));
        assert_eq!(
            config.sso.token_url,
            "https://login.eveonline.com/v2/oauth/token"
        );
        assert!(!config.cache.enabled);
        assert_eq!(config.updater.interval(), Duration::from_secs(900));
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let config: Config = toml::from_str(
            "[sso]\nclient_id = \"abc\"\nclient_secret = \"def\"\n\n[esi]\nmax_retries = 5\n\n[xml]\ntimeout_seconds = 30\n",
        )
        .unwrap();
        assert_eq!(
            config.sso.token_url,
            "https://login.eveonline.com/v2/oauth/token"
        );
        assert_eq!(config.sso.client_credentials(), Some(("abc", "def")));
        assert_eq!(config.esi.max_retries, 5);
        assert_eq!(config.esi.base_url, "https://esi.evetech.net");
        assert_eq!(config.esi.datasource, "tranquility");
        assert_eq!(config.xml.base_url, "https://api.eveonline.com");
        assert_eq!(config.xml.timeout(), Duration::from_secs(30));
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_client_credentials_require_both() {
        let sso = SsoConfig {
            client_id: Some("abc".into()),
            ..Default::default()
        };
        assert!(sso.client_credentials().is_none());
    }

    #[test]
    fn test_interval_never_zero() {
        let u = UpdaterConfig {
            interval_minutes: 0,
        };
        assert_eq!(u.interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.esi.base_url, config.esi.base_url);
        assert_eq!(deserialized.user_agent, config.user_agent);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }
}
