//! Configuration file (pagewright.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pagewright_static::BuildConfig;
use serde::Deserialize;

/// Default config file name.
pub const CONFIG_FILENAME: &str = "pagewright.toml";

/// Configuration file structure.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Source and output locations. Relative entries resolve against `root`.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct PathsConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_styles")]
    pub styles: PathBuf,
    #[serde(default = "default_assets")]
    pub assets: PathBuf,
    #[serde(default = "default_components")]
    pub components: PathBuf,
    #[serde(default = "default_template")]
    pub template: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            styles: default_styles(),
            assets: default_assets(),
            components: default_components(),
            template: default_template(),
            output: default_output(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_styles() -> PathBuf {
    BuildConfig::default().styles_dir
}
fn default_assets() -> PathBuf {
    BuildConfig::default().assets_dir
}
fn default_components() -> PathBuf {
    BuildConfig::default().components_dir
}
fn default_template() -> PathBuf {
    BuildConfig::default().template
}
fn default_output() -> PathBuf {
    BuildConfig::default().output_dir
}

impl ConfigFile {
    /// Resolve into a [`BuildConfig`].
    ///
    /// `root` replaces the configured root; `output` replaces the configured
    /// output and is taken as given rather than joined to the root.
    pub fn build_config(&self, root: Option<PathBuf>, output: Option<PathBuf>) -> BuildConfig {
        let paths = &self.paths;
        let root = root.unwrap_or_else(|| paths.root.clone());

        BuildConfig {
            styles_dir: root.join(&paths.styles),
            assets_dir: root.join(&paths.assets),
            components_dir: root.join(&paths.components),
            template: root.join(&paths.template),
            output_dir: output.unwrap_or_else(|| root.join(&paths.output)),
        }
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("Loaded config from {}", path.display());
        return Ok(config);
    }
    tracing::debug!("No config at {}, using defaults", path.display());
    Ok(ConfigFile::default())
}
