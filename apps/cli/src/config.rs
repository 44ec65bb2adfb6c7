//! CLI configuration.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/filestore/config.toml`
//! - Windows: `%APPDATA%/filestore/config.toml`
//!
//! `--config` or `FILESTORE_CONFIG` point elsewhere. A missing file means
//! defaults; the file is never written by the CLI.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, bail};
use filestore_upload::UploadSettings;
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "FILESTORE_CONFIG";
const API_KEY_ENV: &str = "GEMINI_API_KEY";
const SETTING_ENV_PREFIX: &str = "FILESTORE_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Gemini API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub upload: UploadSettings,

    /// Where this config was loaded from.
    #[serde(skip)]
    pub path: PathBuf,
}

impl Config {
    /// Loads, applies environment overrides and validates.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(config_path),
        };

        let mut config = Self::read(&path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.upload.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Config::default()
        };
        config.path = path.to_path_buf();
        Ok(config)
    }

    /// Applies `GEMINI_API_KEY` and `FILESTORE_<SETTING>` overrides read
    /// through `lookup`.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }

        let u = &mut self.upload;
        override_from(&lookup, "MAX_FILE_SIZE_MB", &mut u.max_file_size_mb)?;
        override_from(
            &lookup,
            "DEFAULT_MAX_TOKENS_PER_CHUNK",
            &mut u.default_max_tokens_per_chunk,
        )?;
        override_from(
            &lookup,
            "DEFAULT_MAX_OVERLAP_TOKENS",
            &mut u.default_max_overlap_tokens,
        )?;
        override_from(&lookup, "MAX_UPLOAD_RETRIES", &mut u.max_upload_retries)?;
        override_from(
            &lookup,
            "UPLOAD_RETRY_INITIAL_DELAY",
            &mut u.upload_retry_initial_delay,
        )?;
        override_from(&lookup, "UPLOAD_RETRY_MAX_DELAY", &mut u.upload_retry_max_delay)?;
        override_from(&lookup, "CONCURRENCY_LIMIT", &mut u.concurrency_limit)?;
        override_from(&lookup, "FAILURE_LOG_PATH", &mut u.failure_log_path)?;
        Ok(())
    }

    /// The API key, or an error telling the user where to set it.
    pub fn api_key(&self) -> anyhow::Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => bail!(
                "no API key configured: set {API_KEY_ENV} or api_key in {}",
                self.path.display()
            ),
        }
    }
}

fn override_from<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    setting: &str,
    target: &mut T,
) -> anyhow::Result<()>
where
    T: FromStr,
    T::Err: Display,
{
    let name = format!("{SETTING_ENV_PREFIX}{setting}");
    if let Some(raw) = lookup(&name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name}={raw:?}: {e}"))?;
    }
    Ok(())
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("filestore").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let base = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
                PathBuf::from(home).join(".config")
            });
        base.join("filestore").join("config.toml")
    }
}
