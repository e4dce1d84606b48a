use crate::error::{FalconError, Result};
use crate::file::DEFAULT_BUCKET;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "FALCON_CONFIG";
const CONFIG_DIR: &str = ".config/falcon";
const CONFIG_FILE: &str = "config.yaml";
const VIEWS_FILE: &str = "views.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// FalconConfig
// ---------------------------------------------------------------------------

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FalconConfig {
    /// Project URL, e.g. `https://abc.example.co`.
    #[serde(default)]
    pub url: String,
    /// Public API key sent as `apikey`.
    #[serde(default)]
    pub anon_key: String,
    /// User session token; falls back to the anon key when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_url: Option<String>,
    #[serde(default = "default_bucket")]
    pub storage_bucket: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_schema() -> String {
    "falcon_mvp".to_string()
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for FalconConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            access_token: None,
            schema: default_schema(),
            realtime_url: None,
            storage_bucket: default_bucket(),
            timeout_secs: default_timeout(),
        }
    }
}

impl FalconConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            ..Default::default()
        }
    }

    /// `$FALCON_CONFIG`, else `~/.config/falcon/config.yaml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(p) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(p));
        }
        let home = home::home_dir().ok_or(FalconError::HomeNotFound)?;
        Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`; a missing file yields the defaults so that flags and
    /// environment variables alone are enough.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: FalconConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Saved views live next to the config file.
    pub fn views_path(config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(VIEWS_FILE)
    }

    fn base(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base())
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.base())
    }

    pub fn storage_url(&self) -> String {
        format!("{}/storage/v1", self.base())
    }

    pub fn realtime_url(&self) -> String {
        match &self.realtime_url {
            Some(u) if !u.trim().is_empty() => u.trim_end_matches('/').to_string(),
            _ => format!("{}/realtime/v1/sse", self.base()),
        }
    }

    /// Token for the `Authorization` header.
    pub fn bearer(&self) -> &str {
        self.access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.anon_key)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.url.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "url is not set (config file, --url or FALCON_URL)".to_string(),
            });
        } else if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("url '{}' must start with http:// or https://", self.url),
            });
        }
        if self.anon_key.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "anon_key is not set (config file, --anon-key or FALCON_ANON_KEY)"
                    .to_string(),
            });
        }
        if self.access_token.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "no access_token: requests run as the anonymous role".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "timeout_secs is 0; requests will never time out".to_string(),
            });
        }
        warnings
    }

    /// Fail with the first error-level warning, if any.
    pub fn ensure_usable(&self) -> Result<()> {
        match self
            .validate()
            .into_iter()
            .find(|w| w.level == WarnLevel::Error)
        {
            Some(w) => Err(FalconError::Config(w.message)),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
