//! Output directory lifecycle.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

use crate::error::BuildError;

/// What [`ensure_clean`] found and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationReport {
    /// Destination root
    pub path: PathBuf,

    /// Whether something already existed at the path and was deleted
    pub removed_existing: bool,
}

/// Make `dest_root` an empty directory.
///
/// Anything already at `dest_root`, directory tree or single file, is removed
/// first and cannot be recovered. Running it twice in a row leaves an empty
/// directory both times.
///
/// Callers must not run two builds into the same destination at once;
/// nothing here locks the directory.
pub async fn ensure_clean(dest_root: &Path) -> Result<DestinationReport, BuildError> {
    let removed_existing = match fs::symlink_metadata(dest_root).await {
        Ok(meta) => {
            let removed = if meta.is_dir() {
                fs::remove_dir_all(dest_root).await
            } else {
                fs::remove_file(dest_root).await
            };
            removed.map_err(BuildError::access(dest_root))?;

            tracing::debug!("Removed previous contents of {}", dest_root.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(BuildError::access(dest_root)(e)),
    };

    fs::create_dir_all(dest_root)
        .await
        .map_err(BuildError::access(dest_root))?;

    tracing::info!("Prepared clean output directory {}", dest_root.display());

    Ok(DestinationReport {
        path: dest_root.to_path_buf(),
        removed_existing,
    })
}
