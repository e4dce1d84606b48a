use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Args;
use falcon_client::RestGateway;
use falcon_core::config::FalconConfig;

/// Where to connect and as whom. Flags and environment variables override
/// the config file.
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Config file (default: ~/.config/falcon/config.yaml)
    #[arg(long, global = true, env = "FALCON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend project URL
    #[arg(long, global = true, env = "FALCON_URL")]
    pub url: Option<String>,

    /// Public API key
    #[arg(long, global = true, env = "FALCON_ANON_KEY", hide_env_values = true)]
    pub anon_key: Option<String>,

    /// User session token
    #[arg(long, global = true, env = "FALCON_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

pub struct Context {
    pub config_path: PathBuf,
    pub config: FalconConfig,
}

impl Context {
    pub fn resolve(args: &ConnectionArgs) -> anyhow::Result<Self> {
        let config_path = match &args.config {
            Some(p) => p.clone(),
            None => FalconConfig::default_path()?,
        };
        let mut config = FalconConfig::load(&config_path)
            .with_context(|| format!("failed to read config {}", config_path.display()))?;

        if let Some(url) = args.url.as_deref().filter(|s| !s.is_empty()) {
            config.url = url.to_string();
        }
        if let Some(key) = args.anon_key.as_deref().filter(|s| !s.is_empty()) {
            config.anon_key = key.to_string();
        }
        if let Some(token) = args.token.as_deref().filter(|s| !s.is_empty()) {
            config.access_token = Some(token.to_string());
        }
        tracing::debug!(path = %config_path.display(), url = %config.url, "config resolved");

        Ok(Self {
            config_path,
            config,
        })
    }

    pub fn gateway(&self) -> anyhow::Result<Arc<RestGateway>> {
        let gateway = RestGateway::new(self.config.clone()).context("cannot connect")?;
        Ok(Arc::new(gateway))
    }

    pub fn views_path(&self) -> PathBuf {
        FalconConfig::views_path(&self.config_path)
    }
}

/// Run one async command on a fresh runtime.
pub fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    Ok(rt.block_on(fut))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flags_override_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let mut file = FalconConfig::new("https://file.example.co", "file-key");
        file.access_token = Some("file-token".into());
        file.save(&path).unwrap();

        let ctx = Context::resolve(&ConnectionArgs {
            config: Some(path.clone()),
            url: Some("https://flag.example.co".into()),
            anon_key: None,
            token: Some(String::new()),
        })
        .unwrap();
        assert_eq!(ctx.config.url, "https://flag.example.co");
        assert_eq!(ctx.config.anon_key, "file-key");
        assert_eq!(ctx.config.access_token.as_deref(), Some("file-token"));
        assert_eq!(ctx.views_path(), dir.path().join("views.yaml"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let ctx = Context::resolve(&ConnectionArgs {
            config: Some(dir.path().join("absent.yaml")),
            ..Default::default()
        })
        .unwrap();
        assert!(ctx.config.url.is_empty());
        assert!(ctx.gateway().is_err());
    }
}
