use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::downloaders::huggingface::HF_ENDPOINT;
use crate::models::ModelCategory;
use crate::orchestrator::RunConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the host installation, its models, and its workflows live
    #[serde(default)]
    pub paths: PathsConfig,

    /// Remote host settings
    #[serde(default)]
    pub downloads: DownloadsConfig,

    /// Which model categories are fetched by default
    #[serde(default)]
    pub categories: CategoryToggles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Host installation root; workflow file selections are relative to it
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,

    /// Models root (default: <base_path>/models)
    #[serde(default)]
    pub models_dir: Option<PathBuf>,

    /// Workflow directory (default: <base_path>/user/default/workflows)
    #[serde(default)]
    pub workflows_dir: Option<PathBuf>,
}

fn default_base_path() -> PathBuf {
    directories::ProjectDirs::from("com", "comfyfetch", "comfyfetch")
        .map(|dirs| dirs.data_dir().join("comfyui"))
        .unwrap_or_else(|| PathBuf::from("ComfyUI"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    /// Base URL of the model host
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Repository revision to download from
    #[serde(default = "default_revision")]
    pub revision: String,

    /// HuggingFace token for gated or private repositories
    #[serde(default)]
    pub hf_token: Option<String>,

    /// Number of downloads allowed to run at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_endpoint() -> String {
    HF_ENDPOINT.to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_max_concurrent() -> usize {
    2
}

/// Per-category enable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryToggles {
    #[serde(default = "enabled")]
    pub checkpoints: bool,
    #[serde(default = "enabled")]
    pub vae: bool,
    #[serde(default = "enabled")]
    pub controlnet: bool,
    #[serde(default)]
    pub loras: bool,
}

fn enabled() -> bool {
    true
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            models_dir: None,
            workflows_dir: None,
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            revision: default_revision(),
            hf_token: None,
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self {
            checkpoints: true,
            vae: true,
            controlnet: true,
            loras: false,
        }
    }
}

impl CategoryToggles {
    pub fn is_enabled(&self, category: ModelCategory) -> bool {
        match category {
            ModelCategory::Checkpoint => self.checkpoints,
            ModelCategory::Vae => self.vae,
            ModelCategory::ControlNet => self.controlnet,
            ModelCategory::Lora => self.loras,
        }
    }

    pub fn set(&mut self, category: ModelCategory, enabled: bool) {
        match category {
            ModelCategory::Checkpoint => self.checkpoints = enabled,
            ModelCategory::Vae => self.vae = enabled,
            ModelCategory::ControlNet => self.controlnet = enabled,
            ModelCategory::Lora => self.loras = enabled,
        }
    }
}

impl DownloadsConfig {
    /// Configured token, else `HF_TOKEN` from the environment.
    pub fn token(&self) -> Option<String> {
        self.hf_token
            .clone()
            .or_else(|| std::env::var("HF_TOKEN").ok())
            .filter(|t| !t.is_empty())
    }
}

impl Config {
    /// Get the base directory: the platform config dir for comfyfetch
    pub fn base_dir() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "comfyfetch", "comfyfetch")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(dirs.config_dir().to_path_buf())
    }

    /// Get the config file path: <base_dir>/config.toml
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Load config from default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Save config to default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.paths.base_path
    }

    pub fn models_dir(&self) -> PathBuf {
        self.paths
            .models_dir
            .clone()
            .unwrap_or_else(|| self.paths.base_path.join("models"))
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.paths.workflows_dir.clone().unwrap_or_else(|| {
            self.paths
                .base_path
                .join("user")
                .join("default")
                .join("workflows")
        })
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            models_root: self.models_dir(),
            categories: self.categories,
            max_concurrent: self.downloads.max_concurrent.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.categories, CategoryToggles::default());
        assert!(!config.categories.is_enabled(ModelCategory::Lora));
        assert!(config.categories.is_enabled(ModelCategory::Checkpoint));
        assert_eq!(config.models_dir(), config.paths.base_path.join("models"));
        assert!(config.workflows_dir().ends_with("user/default/workflows"));
        assert_eq!(config.downloads.endpoint, "https://huggingface.co");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "[paths]\nbase_path = \"/srv/comfy\"\n\n[categories]\nloras = true\nvae = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.models_dir(), PathBuf::from("/srv/comfy/models"));
        assert!(config.categories.loras);
        assert!(!config.categories.vae);
        assert!(config.categories.checkpoints);
        assert_eq!(config.downloads.max_concurrent, 2);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.paths.models_dir = Some(PathBuf::from("/data/models"));
        config.downloads.max_concurrent = 0;
        config.categories.set(ModelCategory::ControlNet, false);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.models_dir(), PathBuf::from("/data/models"));
        assert!(!loaded.categories.controlnet);
        // A zero bound still lets one download run.
        assert_eq!(loaded.run_config().max_concurrent, 1);
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.downloads.revision, "main");
    }
}
