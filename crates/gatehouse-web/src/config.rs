use std::net::SocketAddr;
use std::path::PathBuf;

use gatehouse_core::Settings;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    /// Startup/prerender mode: the auth provider declines every request and
    /// rate limiting is skipped.
    #[serde(default)]
    pub building: bool,
    #[serde(default)]
    pub auth: AuthConfig,
    /// `[rate_limit]` and `[locale]`.
    #[serde(flatten)]
    pub settings: Settings,
    #[serde(default)]
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            session_ttl_seconds: default_session_ttl_seconds(),
            cookie_name: default_cookie_name(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl TlsConfig {
    pub fn is_enabled(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some()
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn default_base_path() -> String {
    "/api/auth".to_string()
}

fn default_session_ttl_seconds() -> u64 {
    7 * 24 * 60 * 60
}

fn default_cookie_name() -> String {
    "gatehouse.session_token".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            building: false,
            auth: AuthConfig::default(),
            settings: Settings::default(),
            tls: TlsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `GATEHOUSE_WEB_CONFIG` (if set), then applies `GATEHOUSE_*`
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("GATEHOUSE_WEB_CONFIG").map(PathBuf::from).ok();

        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
            toml::from_str(&contents)?
        } else {
            ServerConfig::default()
        };

        if let Ok(addr) = std::env::var("GATEHOUSE_BIND_ADDR") {
            config.bind_addr = addr.parse()?;
        }
        if let Some(building) = env_flag("GATEHOUSE_BUILDING") {
            config.building = building;
        }
        if let Some(trust) = env_flag("GATEHOUSE_TRUST_PROXY") {
            config.settings.rate_limit.trust_proxy = trust;
        }
        if let Some(enabled) = env_flag("GATEHOUSE_RATE_LIMIT_ENABLED") {
            config.settings.rate_limit.enabled = enabled;
        }
        if let Ok(cert) = std::env::var("GATEHOUSE_TLS_CERT") {
            config.tls.cert_path = Some(cert);
        }
        if let Ok(key) = std::env::var("GATEHOUSE_TLS_KEY") {
            config.tls.key_path = Some(key);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let base = &self.auth.base_path;
        if !base.starts_with('/') || base.trim_end_matches('/').is_empty() {
            anyhow::bail!("auth.base_path must be a non-root path starting with '/', got {base:?}");
        }
        for (key, name) in [
            ("auth.cookie_name", &self.auth.cookie_name),
            ("locale.cookie_name", &self.settings.locale.cookie_name),
        ] {
            if !is_cookie_name(name) {
                anyhow::bail!("{key} must be a non-empty cookie token, got {name:?}");
            }
        }
        if self.tls.cert_path.is_some() != self.tls.key_path.is_some() {
            tracing::warn!("Only one of tls.cert_path / tls.key_path is set; serving plain HTTP");
        }
        Ok(())
    }
}

/// RFC 6265 cookie-name token: visible ASCII without separators.
fn is_cookie_name(name: &str) -> bool {
    const SEPARATORS: &[u8] = b"()<>@,;:\\\"/[]?={}";
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !SEPARATORS.contains(&b))
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        other => {
            tracing::warn!("Ignoring {name}={other:?}: expected a boolean");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.bind_addr, default_bind_addr());
        assert!(!config.building);
        assert_eq!(config.auth.base_path, "/api/auth");
        assert_eq!(config.auth.cookie_name, "gatehouse.session_token");
        assert!(config.settings.rate_limit.enabled);
        assert_eq!(config.settings.locale.base_locale, "en");
        assert!(!config.tls.is_enabled());
    }

    #[test]
    fn full_file() {
        let config = ServerConfig::from_toml(
            r#"
bind_addr = "0.0.0.0:8443"
building = true

[auth]
base_path = "/auth"
session_ttl_seconds = 60

[rate_limit]
window = 10
max = 3
trust_proxy = true

[rate_limit.custom_rules]
"/sign-in/email" = { window = 30, max = 1 }

[locale]
locales = ["en", "de"]

[tls]
cert_path = "cert.pem"
key_path = "key.pem"
"#,
        )
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8443);
        assert!(config.building);
        assert_eq!(config.auth.base_path, "/auth");
        assert_eq!(config.auth.session_ttl_seconds, 60);
        assert_eq!(config.settings.rate_limit.max, 3);
        assert!(config.settings.rate_limit.trust_proxy);
        assert_eq!(config.settings.rate_limit.custom_rules.len(), 1);
        assert_eq!(config.settings.locale.locales, vec!["en", "de"]);
        assert!(config.tls.is_enabled());
    }

    #[test]
    fn cookie_names_must_be_tokens() {
        assert!(ServerConfig::from_toml("[auth]\ncookie_name = \"\"").is_err());
        assert!(ServerConfig::from_toml("[auth]\ncookie_name = \"a b\"").is_err());
        assert!(ServerConfig::from_toml("[auth]\ncookie_name = \"sid;x\"").is_err());
        assert!(ServerConfig::from_toml("[locale]\ncookie_name = \"lang=\"").is_err());
        assert!(ServerConfig::from_toml("[auth]\ncookie_name = \"__Host-sid\"").is_ok());
    }

    #[test]
    fn root_base_path_is_rejected() {
        assert!(ServerConfig::from_toml("[auth]\nbase_path = \"/\"").is_err());
        assert!(ServerConfig::from_toml("[auth]\nbase_path = \"api/auth\"").is_err());
    }
}
