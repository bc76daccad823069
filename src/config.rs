use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::infra::opensubtitles::OpenSubtitlesCredentials;
use crate::matching::validation::MatchPolicy;

const APP_DIR: &str = "mkv-episode-matcher";

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub tmdb_access_token: Option<String>,
    pub opensubtitles_api_key: Option<String>,
    pub opensubtitles_username: Option<String>,
    pub opensubtitles_password: Option<String>,
    pub language: Option<String>,
    pub ffprobe_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub matching: MatchPolicy,
}

/// Settings for one invocation, after environment overrides.
#[derive(Debug)]
pub struct AppConfig {
    pub file: ConfigFile,
    pub config_dir: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_dir = get_config_dir_path();
        let file = load_config_file(&config_dir.join("config.toml"))?;
        Ok(Self { file, config_dir })
    }

    pub fn tmdb_access_token(&self) -> Result<String> {
        // Environment first, then the config file.
        if let Some(token) = env_value("TMDB_ACCESS_TOKEN") {
            return Ok(token);
        }
        if let Some(token) = non_empty(self.file.tmdb_access_token.clone()) {
            return Ok(token);
        }

        bail!(
            "TMDB access token not found. Set TMDB_ACCESS_TOKEN environment variable or add tmdb_access_token = \"your-token\" to {}",
            self.config_path().display()
        )
    }

    /// `None` unless the API key, username and password are all present.
    pub fn opensubtitles_credentials(&self) -> Option<OpenSubtitlesCredentials> {
        let api_key = env_value("OPENSUBTITLES_API_KEY")
            .or_else(|| non_empty(self.file.opensubtitles_api_key.clone()))?;
        let username = env_value("OPENSUBTITLES_USERNAME")
            .or_else(|| non_empty(self.file.opensubtitles_username.clone()))?;
        let password = env_value("OPENSUBTITLES_PASSWORD")
            .or_else(|| non_empty(self.file.opensubtitles_password.clone()))?;
        Some(OpenSubtitlesCredentials {
            api_key,
            username,
            password,
        })
    }

    pub fn language(&self) -> String {
        non_empty(self.file.language.clone()).unwrap_or_else(|| "en".to_string())
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.file
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.config_dir.join("subtitles"))
    }

    /// Worker threads for probing; 0 lets rayon pick.
    pub fn concurrency(&self) -> usize {
        self.file.concurrency.unwrap_or(0)
    }

    pub fn policy(&self) -> MatchPolicy {
        self.file.matching
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

fn env_value(key: &str) -> Option<String> {
    non_empty(env::var(key).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn load_config_file(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let config_content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&config_content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(config)
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join(APP_DIR))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config_file(&temp_dir.path().join("config.toml")).unwrap();
        assert!(config.tmdb_access_token.is_none());
        assert_eq!(config.matching, MatchPolicy::default());
    }

    #[test]
    fn test_full_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
tmdb_access_token = "tmdb-token"
opensubtitles_api_key = "key"
opensubtitles_username = "user"
opensubtitles_password = "  "
language = "de"
cache_dir = "/var/cache/subs"
concurrency = 3

[matching]
threshold = 0.6
"#,
        )
        .unwrap();

        let config = AppConfig {
            file: load_config_file(&path).unwrap(),
            config_dir: temp_dir.path().to_path_buf(),
        };
        assert_eq!(config.language(), "de");
        assert_eq!(config.cache_dir(), PathBuf::from("/var/cache/subs"));
        assert_eq!(config.concurrency(), 3);
        assert_eq!(config.policy().threshold, 0.6);
        assert_eq!(config.policy().margin, 0.05);
        assert_eq!(config.file.tmdb_access_token.as_deref(), Some("tmdb-token"));
        // A blank password counts as missing.
        assert_eq!(non_empty(config.file.opensubtitles_password.clone()), None);
    }

    #[test]
    fn test_defaults_relative_to_config_dir() {
        let config = AppConfig {
            file: ConfigFile::default(),
            config_dir: PathBuf::from("/home/me/.config/mkv-episode-matcher"),
        };
        assert_eq!(config.language(), "en");
        assert_eq!(
            config.cache_dir(),
            PathBuf::from("/home/me/.config/mkv-episode-matcher/subtitles")
        );
        assert_eq!(config.concurrency(), 0);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "concurrency = \"many\"").unwrap();
        assert!(load_config_file(&path).is_err());
    }
}
