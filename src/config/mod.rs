use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::validator::MAX_IMAGE_BYTES;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,

    /// Notes service endpoints
    pub backend: BackendConfig,

    /// Chat surface settings
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,

    /// Where the light/dark preference is persisted
    pub theme_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub text_path: String,
    pub image_path: String,
    pub video_path: String,

    /// Overall request deadline; unset leaves the transport default in place
    pub timeout_seconds: Option<u64>,

    /// Login session cookie, e.g. `session=...`. Never saved.
    pub session_cookie: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub default_style: String,
    pub shake_millis: u64,
    pub max_image_bytes: u64,
    pub example_videos: Vec<String>,
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".notegen")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            theme_file: app_dir().join("theme"),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            text_path: "/generate-notes".to_string(),
            image_path: "/generate-notes-from-image".to_string(),
            video_path: "/generate-notes-from-video".to_string(),
            timeout_seconds: None,
            session_cookie: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_style: "concise".to_string(),
            shake_millis: 500,
            max_image_bytes: MAX_IMAGE_BYTES,
            example_videos: vec![
                "https://www.youtube.com/watch?v=rfscVS0vtbw".to_string(),
                "https://www.youtube.com/watch?v=aircAruvnKk".to_string(),
                "https://www.youtube.com/watch?v=8hly31xKli0".to_string(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.load_env_vars();

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut safe_config = self.clone();
        safe_config.sanitize_for_save();

        let content = toml::to_string_pretty(&safe_config).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".notegen").join("config.toml"))
    }

    fn load_env_vars(&mut self) {
        if let Ok(url) = std::env::var("NOTEGEN_BACKEND_URL") {
            self.backend.base_url = url;
        }
        if self.backend.session_cookie.is_none() {
            self.backend.session_cookie = std::env::var("NOTEGEN_SESSION").ok();
        }
    }

    fn sanitize_for_save(&mut self) {
        self.backend.session_cookie = None;
    }

    /// Merge with command-line overrides
    pub fn merge_overrides(&mut self, overrides: Vec<(String, String)>) -> Result<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "log_level" => self.general.log_level = value,
                "theme_file" => self.general.theme_file = PathBuf::from(value),
                "base_url" => self.backend.base_url = value,
                "timeout_seconds" => self.backend.timeout_seconds = Some(value.parse()?),
                "style" | "default_style" => self.ui.default_style = value,
                "shake_millis" => self.ui.shake_millis = value.parse()?,
                "max_image_bytes" => self.ui.max_image_bytes = value.parse()?,
                _ => bail!("Unknown config key: {}", key),
            }
        }
        Ok(())
    }
}

/// Load or create configuration
pub fn load_or_create_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_path = if let Some(p) = path {
        p.to_path_buf()
    } else {
        AppConfig::default_path()?
    };

    if config_path.exists() {
        AppConfig::load(&config_path)
    } else {
        let mut config = AppConfig::default();
        config.save(&config_path)?;
        config.load_env_vars();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.backend.text_path, "/generate-notes");
        assert_eq!(config.backend.image_path, "/generate-notes-from-image");
        assert_eq!(config.backend.video_path, "/generate-notes-from-video");
        assert_eq!(config.backend.timeout_seconds, None);
        assert_eq!(config.ui.default_style, "concise");
        assert_eq!(config.ui.shake_millis, 500);
        assert_eq!(config.ui.max_image_bytes, 5_242_880);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.ui.default_style = "visual".to_string();
        config.backend.session_cookie = Some("session=secret".to_string());
        config.save(&config_path).unwrap();

        let written = std::fs::read_to_string(&config_path).unwrap();
        assert!(!written.contains("secret"));

        let loaded = AppConfig::load(&config_path).unwrap();
        assert_eq!(loaded.ui.default_style, "visual");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[ui]\nshake_millis = 250\n").unwrap();

        let loaded = AppConfig::load(&config_path).unwrap();
        assert_eq!(loaded.ui.shake_millis, 250);
        assert_eq!(loaded.ui.default_style, "concise");
        assert_eq!(loaded.backend.video_path, "/generate-notes-from-video");
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        load_or_create_config(Some(&config_path)).unwrap();
        assert!(config_path.exists());
    }

    #[test]
    fn test_merge_overrides() {
        let mut config = AppConfig::default();

        let overrides = vec![
            ("log_level".to_string(), "debug".to_string()),
            ("timeout_seconds".to_string(), "30".to_string()),
            ("style".to_string(), "detailed".to_string()),
        ];

        config.merge_overrides(overrides).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.backend.timeout_seconds, Some(30));
        assert_eq!(config.ui.default_style, "detailed");

        let bad = vec![("colour".to_string(), "blue".to_string())];
        assert!(config.merge_overrides(bad).is_err());
    }
}
