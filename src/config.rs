use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Environment variables checked for the API key, in priority order.
const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "API_KEY", "GOOGLE_API_KEY"];

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub chat_model: Option<String>,
    pub image_model: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the config file and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// The config file alone, without environment overrides. Use this as the
    /// base for `save` so keys from the environment are never written out.
    pub fn load_file() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Environment values win over the file. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_VARS.iter().find_map(|name| non_empty(name)) {
            self.api_key = Some(key);
        }
        if let Some(base) = non_empty("GEMINI_API_BASE") {
            self.api_base = Some(base);
        }
    }

    /// Set the preferences given on the command line. Returns whether
    /// anything was given.
    pub fn set_preferences(
        &mut self,
        chat_model: Option<String>,
        image_model: Option<String>,
        output_dir: Option<PathBuf>,
    ) -> bool {
        let changed = chat_model.is_some() || image_model.is_some() || output_dir.is_some();
        if chat_model.is_some() {
            self.chat_model = chat_model;
        }
        if image_model.is_some() {
            self.image_model = image_model;
        }
        if output_dir.is_some() {
            self.output_dir = output_dir;
        }
        changed
    }

    pub fn is_api_key_set(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    pub fn chat_model(&self) -> &str {
        self.chat_model.as_deref().unwrap_or(DEFAULT_CHAT_MODEL)
    }

    pub fn image_model(&self) -> &str {
        self.image_model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL)
    }

    /// Where edited images are written.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            data_dir()
                .map(|d| d.join("edits"))
                .unwrap_or_else(|_| PathBuf::from("edits"))
        })
    }

    /// `<config_dir>/issam/config.json`.
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("issam").join("config.json"))
    }
}

/// Per-user data directory (logs, edited images).
pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(base.join("issam"))
}
