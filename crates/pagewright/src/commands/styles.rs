//! Stylesheet-only bundle command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pagewright_static::bundle_styles;

use crate::config::load_config;
use crate::output::format_bundle;

/// Run the styles command.
///
/// Unlike `build`, the output directory is not wiped: only its bundle.css is
/// replaced.
pub async fn run(config_path: &Path, root: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?.build_config(root, output);

    tracing::info!("Bundling styles from {}", config.styles_dir.display());

    let report = bundle_styles(&config.styles_dir, &config.output_dir)
        .await
        .context("Failed to bundle styles")?;

    print!("{}", format_bundle(&report));

    Ok(())
}
