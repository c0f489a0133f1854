//! Gateway settings loaded from a TOML file.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! working configuration: rate limiting on, 30 requests per minute, with
//! stricter windows for the email sign-up and sign-in routes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Top-level gateway settings.
///
/// Call [`Settings::load`] to read from a TOML path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub locale: LocaleSettings,
}

impl Settings {
    /// Loads settings from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the file does not exist.
    /// - [`CoreError::PermissionDenied`] if the file is not readable.
    /// - [`CoreError::ConfigParse`] if the TOML is malformed or names an
    ///   unknown storage backend.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => CoreError::PermissionDenied(path.to_path_buf()),
            _ => CoreError::Io(e),
        })?;
        Self::from_toml(&content)
    }

    /// Parses settings from TOML text.
    pub fn from_toml(content: &str) -> CoreResult<Self> {
        toml::from_str(content).map_err(|e| CoreError::ConfigParse(e.to_string()))
    }
}

/// Counter store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-local counters. Lost on restart.
    #[default]
    Memory,
}

/// Raw `{ window, max }` pair as written in the config file.
///
/// Values are signed so that a zero or negative entry surfaces as a
/// [`CoreError::InvalidPolicy`] when the policy table is built, rather than
/// as an opaque TOML type error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSettings {
    /// Window length in seconds.
    pub window: i64,
    /// Requests allowed per window.
    pub max: i64,
}

/// `[rate_limit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_window")]
    pub window: i64,
    #[serde(default = "default_max")]
    pub max: i64,
    #[serde(default)]
    pub storage: StorageKind,
    /// Exact route path → override policy.
    #[serde(default = "default_custom_rules", alias = "customRules")]
    pub custom_rules: BTreeMap<String, RuleSettings>,
    /// Use `X-Forwarded-For` / `X-Real-IP` to identify clients.
    ///
    /// Only safe behind a proxy that overwrites these headers.
    #[serde(default)]
    pub trust_proxy: bool,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            window: default_window(),
            max: default_max(),
            storage: StorageKind::Memory,
            custom_rules: default_custom_rules(),
            trust_proxy: false,
        }
    }
}

impl RateLimitSettings {
    /// The default `{ window, max }` pair.
    pub fn default_rule(&self) -> RuleSettings {
        RuleSettings {
            window: self.window,
            max: self.max,
        }
    }
}

/// `[locale]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleSettings {
    #[serde(default = "default_base_locale")]
    pub base_locale: String,
    #[serde(default = "default_locales")]
    pub locales: Vec<String>,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Token in HTML responses replaced by the resolved locale.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            base_locale: default_base_locale(),
            locales: default_locales(),
            cookie_name: default_cookie_name(),
            placeholder: default_placeholder(),
        }
    }
}

impl LocaleSettings {
    /// Known locales, always including the base locale.
    pub fn known_locales(&self) -> Vec<String> {
        let mut known = self.locales.clone();
        if !known.iter().any(|l| l == &self.base_locale) {
            known.insert(0, self.base_locale.clone());
        }
        known
    }
}

fn default_true() -> bool {
    true
}

fn default_window() -> i64 {
    60
}

fn default_max() -> i64 {
    30
}

fn default_custom_rules() -> BTreeMap<String, RuleSettings> {
    BTreeMap::from([
        (
            "/sign-up/email".to_string(),
            RuleSettings {
                window: 900,
                max: 5,
            },
        ),
        (
            "/sign-in/email".to_string(),
            RuleSettings {
                window: 900,
                max: 10,
            },
        ),
    ])
}

fn default_base_locale() -> String {
    "en".to_string()
}

fn default_locales() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_cookie_name() -> String {
    "GATEHOUSE_LOCALE".to_string()
}

fn default_placeholder() -> String {
    "%gatehouse.lang%".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_rate_limit_settings() {
        let settings = Settings::default();
        let rl = &settings.rate_limit;
        assert!(rl.enabled);
        assert_eq!(rl.window, 60);
        assert_eq!(rl.max, 30);
        assert_eq!(rl.storage, StorageKind::Memory);
        assert!(!rl.trust_proxy);
        assert_eq!(
            rl.custom_rules.get("/sign-up/email"),
            Some(&RuleSettings { window: 900, max: 5 })
        );
        assert_eq!(
            rl.custom_rules.get("/sign-in/email"),
            Some(&RuleSettings { window: 900, max: 10 })
        );
    }

    #[test]
    fn default_locale_settings() {
        let locale = LocaleSettings::default();
        assert_eq!(locale.base_locale, "en");
        assert_eq!(locale.locales, vec!["en".to_string()]);
        assert_eq!(locale.placeholder, "%gatehouse.lang%");
    }

    #[test]
    fn load_full_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gatehouse.toml");
        fs::write(
            &path,
            r#"
[rate_limit]
enabled = false
window = 120
max = 50
storage = "memory"
trust_proxy = true

[rate_limit.custom_rules]
"/forget-password" = { window = 3600, max = 3 }

[locale]
base_locale = "ko"
locales = ["ko", "en"]
cookie_name = "lang"
placeholder = "%lang%"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();

        assert!(!settings.rate_limit.enabled);
        assert_eq!(settings.rate_limit.window, 120);
        assert_eq!(settings.rate_limit.max, 50);
        assert!(settings.rate_limit.trust_proxy);
        assert_eq!(settings.rate_limit.custom_rules.len(), 1);
        assert_eq!(
            settings.rate_limit.custom_rules["/forget-password"],
            RuleSettings { window: 3600, max: 3 }
        );

        assert_eq!(settings.locale.base_locale, "ko");
        assert_eq!(settings.locale.locales, vec!["ko", "en"]);
        assert_eq!(settings.locale.cookie_name, "lang");
        assert_eq!(settings.locale.placeholder, "%lang%");
    }

    #[test]
    fn camel_case_custom_rules_alias() {
        let settings = Settings::from_toml(
            r#"
[rate_limit.customRules]
"/sign-up/email" = { window = 10, max = 1 }
"#,
        )
        .unwrap();
        assert_eq!(
            settings.rate_limit.custom_rules["/sign-up/email"],
            RuleSettings { window: 10, max: 1 }
        );
    }

    #[test]
    fn load_partial_toml_uses_defaults() {
        let settings = Settings::from_toml("[rate_limit]\nmax = 5\n").unwrap();
        assert_eq!(settings.rate_limit.max, 5);
        assert_eq!(settings.rate_limit.window, 60);
        assert_eq!(settings.rate_limit.custom_rules.len(), 2);
        assert_eq!(settings.locale.base_locale, "en");
    }

    #[test]
    fn load_empty_toml_uses_all_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gatehouse.toml");
        fs::write(&path, "").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(settings.rate_limit.enabled);
        assert_eq!(settings.rate_limit.default_rule(), RuleSettings { window: 60, max: 30 });
    }

    #[test]
    fn unknown_storage_is_a_parse_error() {
        let result = Settings::from_toml("[rate_limit]\nstorage = \"redis\"\n");
        assert!(matches!(result.unwrap_err(), CoreError::ConfigParse(_)));
    }

    #[test]
    fn load_nonexistent_returns_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = Settings::load(&tmp.path().join("nonexistent.toml"));
        assert!(matches!(result.unwrap_err(), CoreError::NotFound(_)));
    }

    #[test]
    fn load_invalid_toml_returns_config_parse() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("gatehouse.toml");
        fs::write(&path, "this is not valid [[[toml").unwrap();

        let result = Settings::load(&path);
        assert!(matches!(result.unwrap_err(), CoreError::ConfigParse(_)));
    }

    #[test]
    fn known_locales_include_base() {
        let locale = LocaleSettings {
            base_locale: "en".to_string(),
            locales: vec!["de".to_string()],
            ..LocaleSettings::default()
        };
        assert_eq!(locale.known_locales(), vec!["en", "de"]);
    }
}
