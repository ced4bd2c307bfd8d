//! Directory copy command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use pagewright_static::assets::default_mirror_destination;
use pagewright_static::builder::paths_overlap;
use pagewright_static::{copy_tree, ensure_clean};

use crate::output::{format_destination, format_mirror};

/// Run the mirror command.
pub async fn run(source: PathBuf, destination: Option<PathBuf>) -> Result<()> {
    if !source.is_dir() {
        anyhow::bail!("Not a directory: {}", source.display());
    }

    let destination = destination.unwrap_or_else(|| default_mirror_destination(&source));

    if paths_overlap(&destination, &source, true)? {
        anyhow::bail!(
            "Destination {} overlaps source {}",
            destination.display(),
            source.display()
        );
    }

    tracing::info!(
        "Copying {} to {}",
        source.display(),
        destination.display()
    );

    let cleaned = ensure_clean(&destination)
        .await
        .context("Failed to prepare destination")?;
    let report = copy_tree(&source, &destination)
        .await
        .context("Failed to copy directory")?;

    print!("{}", format_destination(&cleaned));
    print!("{}", format_mirror(&report));

    Ok(())
}
