//! Configuration management for wlstart
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files: the window title and buffer geometry, plus general
//! runtime switches.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::buffer::{PixelFormat, MAX_DIMENSION};

/// Main configuration struct containing all client settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    /// Window and buffer settings
    #[serde(default)]
    pub window: WindowConfig,

    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Window and buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Toplevel title
    pub title: String,

    /// Buffer width (pixels)
    pub width: u32,

    /// Buffer height (pixels)
    pub height: u32,

    /// Pixel format ("xrgb8888", "argb8888")
    pub format: String,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Learn Wayland".to_string(),
            width: 640,
            height: 480,
            format: "xrgb8888".to_string(),
        }
    }
}

impl WindowConfig {
    /// Parsed pixel format; falls back to XRGB8888 for unvalidated input
    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::from_name(&self.format).unwrap_or(PixelFormat::Xrgb8888)
    }
}

/// Expands a leading `~` to `$HOME`
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    if path.to_string_lossy().starts_with('~') {
        let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
        let rest = path.strip_prefix("~").unwrap_or(path);
        Ok(Path::new(&home).join(rest))
    } else {
        Ok(path.to_path_buf())
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_home(path.as_ref())?;

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: ClientConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.window.title.trim().is_empty() {
            anyhow::bail!("Invalid title: must not be empty");
        }

        if self.window.width == 0 || self.window.width > MAX_DIMENSION {
            anyhow::bail!("Invalid width {}: must be between 1 and {}", self.window.width, MAX_DIMENSION);
        }

        if self.window.height == 0 || self.window.height > MAX_DIMENSION {
            anyhow::bail!("Invalid height {}: must be between 1 and {}", self.window.height, MAX_DIMENSION);
        }

        if PixelFormat::from_name(&self.window.format).is_none() {
            anyhow::bail!("Invalid pixel format: {}", self.window.format);
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}
