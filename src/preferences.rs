//! State cells the orchestrator reads but does not own: the persisted theme,
//! the selected note style and the active input tab.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use tracing::debug;

use crate::conversation::Modality;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(anyhow::anyhow!("Unknown theme: {}", s)),
        }
    }
}

/// Two-valued theme preference persisted to a small file.
#[derive(Debug)]
pub struct ThemePreference {
    path: PathBuf,
    current: Theme,
}

impl ThemePreference {
    /// Reads the stored preference; a missing or unreadable file means light.
    pub fn load(path: &Path) -> Self {
        let current = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        Self {
            path: path.to_path_buf(),
            current,
        }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn toggle(&mut self) -> Result<Theme> {
        let next = self.current.toggled();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(&self.path, next.to_string())
            .with_context(|| format!("Failed to write theme preference: {}", self.path.display()))?;
        self.current = next;
        debug!(theme = %next, "theme toggled");
        Ok(next)
    }
}

/// Styles offered by the selector. Any other string is passed through as-is.
pub const KNOWN_STYLES: [&str; 3] = ["concise", "detailed", "visual"];

/// Single-writer cell holding the selected note style.
#[derive(Debug, Clone)]
pub struct StyleSelector {
    inner: Arc<RwLock<String>>,
}

impl StyleSelector {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial.into())),
        }
    }

    pub fn current(&self) -> String {
        self.inner
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn set(&self, style: impl Into<String>) {
        let style = style.into();
        debug!(style = %style, "style selected");
        match self.inner.write() {
            Ok(mut guard) => *guard = style,
            Err(poisoned) => *poisoned.into_inner() = style,
        }
    }
}

impl Default for StyleSelector {
    fn default() -> Self {
        Self::new("concise")
    }
}

/// Which input pane is showing. Purely presentational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Text,
    Image,
    Video,
}

impl Tab {
    pub fn modality(self) -> Modality {
        match self {
            Tab::Text => Modality::Text,
            Tab::Image => Modality::Image,
            Tab::Video => Modality::Video,
        }
    }
}

impl FromStr for Tab {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Tab::Text),
            "image" => Ok(Tab::Image),
            "video" => Ok(Tab::Video),
            _ => Err(anyhow::anyhow!("Unknown tab: {} (expected text, image or video)", s)),
        }
    }
}
