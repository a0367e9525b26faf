//! Editor settings management
//!
//! Settings live in a `settings.json` file inside the host's data
//! directory. A file that fails to parse is ignored and defaults are used.

use crate::Result;
use edit_engine::FootnoteConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted editor settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorSettings {
    /// Footnote editing behavior
    pub footnotes: FootnoteConfig,
}

fn parse_or_default(content: &str) -> EditorSettings {
    match serde_json::from_str::<EditorSettings>(content) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to parse settings file, using defaults: {}", e);
            EditorSettings::default()
        }
    }
}

/// Loads, saves and updates the editor settings
pub struct SettingsManager {
    settings_path: PathBuf,
    current: EditorSettings,
}

impl SettingsManager {
    /// Create a settings manager for the given data directory
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            settings_path: data_dir.as_ref().join("settings.json"),
            current: EditorSettings::default(),
        }
    }

    /// Use an explicit settings file
    pub fn with_path(settings_path: PathBuf) -> Self {
        Self {
            settings_path,
            current: EditorSettings::default(),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &EditorSettings {
        &self.current
    }

    /// Load settings from disk, or defaults if the file doesn't exist
    pub async fn load(&mut self) -> Result<&EditorSettings> {
        self.current = if self.settings_path.exists() {
            let content = tokio::fs::read_to_string(&self.settings_path).await?;
            parse_or_default(&content)
        } else {
            EditorSettings::default()
        };
        Ok(&self.current)
    }

    /// Load settings synchronously
    pub fn load_sync(&mut self) -> Result<&EditorSettings> {
        self.current = if self.settings_path.exists() {
            let content = std::fs::read_to_string(&self.settings_path)?;
            parse_or_default(&content)
        } else {
            EditorSettings::default()
        };
        Ok(&self.current)
    }

    /// Save current settings to disk
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&self.current)?;
        tokio::fs::write(&self.settings_path, content).await?;
        Ok(())
    }

    pub fn save_sync(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.current)?;
        std::fs::write(&self.settings_path, content)?;
        Ok(())
    }

    /// Replace the settings and save them
    pub async fn update(&mut self, settings: EditorSettings) -> Result<()> {
        self.current = settings;
        self.save().await
    }

    pub fn update_sync(&mut self, settings: EditorSettings) -> Result<()> {
        self.current = settings;
        self.save_sync()
    }

    /// Reset settings to defaults and save
    pub fn reset_sync(&mut self) -> Result<&EditorSettings> {
        self.current = EditorSettings::default();
        self.save_sync()?;
        Ok(&self.current)
    }
}
