//! Full page build command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pagewright_static::StaticBuilder;

use crate::config::load_config;
use crate::output::format_build;

/// Run the build command.
pub async fn run(
    config_path: &Path,
    root: Option<PathBuf>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    tracing::info!("Building static page...");

    let config = load_config(config_path)?.build_config(root, output);

    let result = StaticBuilder::new(config)
        .build()
        .await
        .context("Build aborted")?;

    if json {
        let report = serde_json::to_string_pretty(&result).context("Failed to encode report")?;
        println!("{}", report);
    } else {
        print!("{}", format_build(&result));
    }

    if !result.is_success() {
        tracing::warn!(
            "Build finished with {} failures; output may be incomplete",
            result.failure_count()
        );
    }

    Ok(())
}
