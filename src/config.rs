//! # Configuration Module
//!
//! Router-wide settings, owned by a single [`crate::router::Router`] instance.
//!
//! Settings come from a YAML file, then environment overrides:
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `ROUTEMUX_HTTP_HOST` | `http_host` | unset (use the request host) |
//! | `ROUTEMUX_HTTPS_HOST` | `https_host` | unset (use the request host) |
//! | `ROUTEMUX_SCHEME_REDIRECT_STATUS` | `scheme_redirect_status` | `303` |
//! | `ROUTEMUX_SLASH_POLICY` | `default_slash_policy` | `fuzzy` |
//! | `ROUTEMUX_TRUST_FORWARDED_PROTO` | `trust_forwarded_proto` | `false` |
//! | `ROUTEMUX_SESSION_GC_SECS` | `session_gc_interval_secs` | `60` |
//!
//! ```yaml
//! http_host: example.com
//! https_host: secure.example.com
//! scheme_redirect_status: 303
//! default_slash_policy: redirect_to_canonical
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::router::SlashPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Host used when redirecting an http-only route away from TLS.
    pub http_host: Option<String>,
    /// Host used when redirecting to https.
    pub https_host: Option<String>,
    /// Status for scheme redirects; must be 3xx.
    pub scheme_redirect_status: u16,
    /// Slash policy given to new routes.
    pub default_slash_policy: SlashPolicy,
    /// Treat `x-forwarded-proto: https` as a TLS connection.
    pub trust_forwarded_proto: bool,
    pub session_gc_interval_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            http_host: None,
            https_host: None,
            scheme_redirect_status: 303,
            default_slash_policy: SlashPolicy::Fuzzy,
            trust_forwarded_proto: false,
            session_gc_interval_secs: 60,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {e}"),
            ConfigError::Invalid { key, value } => {
                write!(f, "invalid value {value:?} for {key}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl RouterConfig {
    /// Defaults plus environment overrides.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for an unparseable variable or a non-3xx status.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|k| std::env::var(k).ok())
    }

    /// Read a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// I/O, YAML and validation failures.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let cfg = Self::from_yaml(&text)?.with_overrides(|k| std::env::var(k).ok())?;
        info!(
            path = %path.display(),
            scheme_redirect_status = cfg.scheme_redirect_status,
            slash_policy = ?cfg.default_slash_policy,
            "Router configuration loaded"
        );
        Ok(cfg)
    }

    /// Parse and validate YAML text.
    ///
    /// # Errors
    ///
    /// YAML and validation failures.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(text)?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides looked up by variable name, then validate.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for a value that doesn't parse.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ROUTEMUX_HTTP_HOST") {
            self.http_host = non_empty(v);
        }
        if let Some(v) = lookup("ROUTEMUX_HTTPS_HOST") {
            self.https_host = non_empty(v);
        }
        if let Some(v) = lookup("ROUTEMUX_SCHEME_REDIRECT_STATUS") {
            self.scheme_redirect_status = parse(&v, "ROUTEMUX_SCHEME_REDIRECT_STATUS")?;
        }
        if let Some(v) = lookup("ROUTEMUX_SLASH_POLICY") {
            self.default_slash_policy = parse(&v, "ROUTEMUX_SLASH_POLICY")?;
        }
        if let Some(v) = lookup("ROUTEMUX_TRUST_FORWARDED_PROTO") {
            self.trust_forwarded_proto = parse_bool(&v, "ROUTEMUX_TRUST_FORWARDED_PROTO")?;
        }
        if let Some(v) = lookup("ROUTEMUX_SESSION_GC_SECS") {
            self.session_gc_interval_secs = parse(&v, "ROUTEMUX_SESSION_GC_SECS")?;
        }
        self.validate()?;
        Ok(self)
    }

    /// # Errors
    ///
    /// [`ConfigError::Invalid`] if `scheme_redirect_status` isn't 3xx or the GC
    /// interval is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(300..400).contains(&self.scheme_redirect_status) {
            return Err(ConfigError::Invalid {
                key: "scheme_redirect_status",
                value: self.scheme_redirect_status.to_string(),
            });
        }
        if self.session_gc_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "session_gc_interval_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn session_gc_interval(&self) -> Duration {
        Duration::from_secs(self.session_gc_interval_secs)
    }
}

fn non_empty(v: String) -> Option<String> {
    let t = v.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn parse<T: std::str::FromStr>(v: &str, key: &'static str) -> Result<T, ConfigError> {
    v.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: v.to_string(),
    })
}

fn parse_bool(v: &str, key: &'static str) -> Result<bool, ConfigError> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: v.to_string(),
        }),
    }
}
