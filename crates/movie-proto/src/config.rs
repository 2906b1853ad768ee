use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Where movies and favourites come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to a TOML catalog (`[[movie]]` tables).  The embedded catalog is
    /// used when this file does not exist.
    #[serde(default = "default_catalog_toml")]
    pub catalog_toml: PathBuf,
    /// JSON file holding the favoured movie ids.
    #[serde(default = "default_favourites_file")]
    pub favourites_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Delay between image changes of an expanded row.
    #[serde(default = "default_image_cycle_ms")]
    pub image_cycle_ms: u64,
    /// Duration of the expand/collapse arrow rotation.
    #[serde(default = "default_rotation_ms")]
    pub rotation_ms: u64,
    #[serde(default = "default_show_keys_bar")]
    pub show_keys_bar: bool,
}

impl UiConfig {
    pub fn image_cycle(&self) -> Duration {
        Duration::from_millis(self.image_cycle_ms.max(1))
    }

    pub fn rotation(&self) -> Duration {
        Duration::from_millis(self.rotation_ms)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            catalog_toml: default_catalog_toml(),
            favourites_file: default_favourites_file(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            image_cycle_ms: default_image_cycle_ms(),
            rotation_ms: default_rotation_ms(),
            show_keys_bar: default_show_keys_bar(),
        }
    }
}

fn default_catalog_toml() -> PathBuf {
    platform::config_dir().join("movies.toml")
}

fn default_favourites_file() -> PathBuf {
    platform::data_dir().join("favourites.json")
}

fn default_image_cycle_ms() -> u64 {
    5000
}

fn default_rotation_ms() -> u64 {
    300
}

fn default_show_keys_bar() -> bool {
    true
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load `config_path`, writing the defaults there first if it is missing.
    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
