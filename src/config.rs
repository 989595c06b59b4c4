use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for the landscape-exif tool.
///
/// Controls how posts and images are fetched and where derived images
/// are written.
///
/// # Loading
///
/// ```rust,no_run
/// use landscape_exif::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.fetch.timeout_secs = Some(10);
/// config.output.overwrite = true;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP settings shared by the post and image fetches.
    pub fetch: FetchConfig,
    /// Where and how derived images are written.
    pub output: OutputConfig,
}

/// HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request deadline in seconds. `None` means no deadline.
    pub timeout_secs: Option<u64>,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

/// Output behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory derived images are written to. `.` is the working directory.
    pub destination: PathBuf,
    /// If `true`, replace an existing image with the same name.
    pub overwrite: bool,
}

impl FetchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig {
                timeout_secs: Some(30),
                user_agent: format!("landscape-exif/{}", env!("CARGO_PKG_VERSION")),
            },
            output: OutputConfig {
                destination: PathBuf::from("."),
                overwrite: false,
            },
        }
    }
}

impl Config {
    /// Resolve the config file path: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_timeout() {
        let config = Config::default();
        assert_eq!(config.fetch.timeout(), Some(Duration::from_secs(30)));
        assert!(config.fetch.user_agent.starts_with("landscape-exif/"));
    }

    #[test]
    fn no_timeout() {
        let fetch = FetchConfig {
            timeout_secs: None,
            user_agent: String::new(),
        };
        assert_eq!(fetch.timeout(), None);
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(config.output.destination, PathBuf::from("."));
    }

    #[test]
    fn existing_images_are_kept_by_default() {
        assert!(!Config::default().output.overwrite);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.fetch.timeout_secs = Some(5);
        config.output.destination = PathBuf::from("/tmp/landscapes");
        config.output.overwrite = true;
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.fetch.timeout_secs, Some(5));
        assert_eq!(loaded.output.destination, PathBuf::from("/tmp/landscapes"));
        assert!(loaded.output.overwrite);
    }

    #[test]
    fn load_invalid_json_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
