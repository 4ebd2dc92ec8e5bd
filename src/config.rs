use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use passfit_vision::{DetectionFilter, PhotoStandard};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(path) = option_env!("PASSFIT_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    ProjectDirs::from("", "", "passfit")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("/usr/local/etc/passfit/config.toml"))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Faces reported below this confidence are ignored.
    pub min_confidence: f64,
    /// Merge overlapping detections above this IoU before counting faces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nms_threshold: Option<f64>,
    pub standard: PhotoStandard,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            nms_threshold: None,
            standard: PhotoStandard::default(),
        }
    }
}

impl Config {
    pub fn detection_filter(&self) -> DetectionFilter {
        DetectionFilter {
            min_confidence: self.min_confidence,
            nms_threshold: self.nms_threshold,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(CONFIG_PATH.as_path());
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.standard
        .validate()
        .with_context(|| format!("invalid standard in {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(CONFIG_PATH.as_path());
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data).with_context(|| format!("writing config {}", path.display()))?;
    Ok(())
}
