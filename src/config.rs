use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Directory recordings are written to and listed from.
    #[serde(default = "default_recordings_dir")]
    pub recordings_dir: PathBuf,
}

fn default_recordings_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("Recordings")
        .join("voxnote")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recordings_dir: default_recordings_dir(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    /// (`~/.config/voxnote/config.json`), creating it on first run.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read config file: {config_path:?}"))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {config_path:?}"))?;

        tracing::info!("loaded config from {:?}", config_path);
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {parent:?}"))?;
        }

        let contents = serde_json::to_string_pretty(self).context("failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("failed to write config file: {config_path:?}"))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.recordings_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("recordings_dir cannot be empty"));
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Application directory under the XDG config root; also where the log
    /// file lives.
    pub fn config_dir() -> Result<PathBuf> {
        let config_root = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_root.join("voxnote"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.recordings_dir.ends_with("Recordings/voxnote"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_explicit_dir_is_kept() {
        let config: Config = serde_json::from_str(r#"{"recordings_dir": "/tmp/notes"}"#).unwrap();
        assert_eq!(config.recordings_dir, PathBuf::from("/tmp/notes"));
    }

    #[test]
    fn test_empty_dir_is_rejected() {
        let config = Config {
            recordings_dir: PathBuf::new(),
        };
        assert!(config.validate().is_err());
    }
}
