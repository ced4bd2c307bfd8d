//! Static asset tree mirroring.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::task::JoinHandle;

use crate::error::BuildError;

/// Suffix appended to a directory name by [`default_mirror_destination`].
pub const MIRROR_SUFFIX: &str = "-copy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Directory,
}

/// An entry of the source tree and where it is mirrored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetNode {
    /// Path relative to both roots
    pub relative: PathBuf,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: NodeKind,
}

/// Outcome for a single entry of the tree.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetStatus {
    Copied { bytes: u64 },
    Created,
    /// Symbolic link to a directory, not followed
    Skipped,
    Failed { error: BuildError },
}

#[derive(Debug, Serialize)]
pub struct AssetEntry {
    /// Path relative to the mirrored roots
    pub path: PathBuf,

    /// Unknown when the entry could not be inspected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,

    #[serde(flatten)]
    pub status: AssetStatus,
}

/// Result of mirroring a tree.
#[derive(Debug, Serialize)]
pub struct MirrorReport {
    pub source: PathBuf,
    pub destination: PathBuf,

    /// Every entry below the source root, sorted by path
    pub entries: Vec<AssetEntry>,
}

impl MirrorReport {
    pub fn files_copied(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, AssetStatus::Copied { .. }))
            .count()
    }

    pub fn directories_created(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, AssetStatus::Created))
            .count()
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Path, &BuildError)> {
        self.entries.iter().filter_map(|e| match &e.status {
            AssetStatus::Failed { error } => Some((e.path.as_path(), error)),
            _ => None,
        })
    }
}

/// Copy `src_dir` into `dest_dir`, keeping relative paths and bytes.
///
/// Each directory is created before its listing is read, so every copy below
/// it is issued only once it exists. File copies run concurrently. A failure
/// on one entry is recorded and its siblings carry on; only failing to create
/// `dest_dir` or to list `src_dir` itself fails the whole copy.
///
/// Symbolic links to files are copied as the file they point to. Links to
/// directories are skipped, since they may point back up the tree.
pub async fn copy_tree(src_dir: &Path, dest_dir: &Path) -> Result<MirrorReport, BuildError> {
    fs::create_dir_all(dest_dir)
        .await
        .map_err(BuildError::write(dest_dir))?;

    let root_listing = list_dir(src_dir).await.map_err(BuildError::read(src_dir))?;

    let mut entries: Vec<AssetEntry> = Vec::new();
    let mut copies: Vec<(AssetNode, JoinHandle<io::Result<u64>>)> = Vec::new();

    // Directories whose destination already exists, with their listing.
    let mut pending: VecDeque<(PathBuf, Vec<OsString>)> = VecDeque::new();
    pending.push_back((PathBuf::new(), root_listing));

    while let Some((relative_dir, names)) = pending.pop_front() {
        for name in names {
            let relative = relative_dir.join(&name);
            let source = src_dir.join(&relative);
            let destination = dest_dir.join(&relative);

            let meta = match fs::metadata(&source).await {
                Ok(meta) => meta,
                Err(e) => {
                    let error = BuildError::read(&source)(e);
                    tracing::warn!("Skipping asset {}: {}", relative.display(), error);
                    entries.push(AssetEntry {
                        path: relative,
                        kind: None,
                        status: AssetStatus::Failed { error },
                    });
                    continue;
                }
            };

            if meta.is_dir() && is_symlink(&source).await {
                tracing::warn!("Skipping linked directory {}", relative.display());
                entries.push(AssetEntry {
                    path: relative,
                    kind: Some(NodeKind::Directory),
                    status: AssetStatus::Skipped,
                });
            } else if meta.is_dir() {
                let listed = match fs::create_dir(&destination).await {
                    Ok(()) => list_dir(&source).await.map_err(BuildError::read(&source)),
                    Err(e) => Err(BuildError::write(&destination)(e)),
                };

                let status = match listed {
                    Ok(children) => {
                        pending.push_back((relative.clone(), children));
                        AssetStatus::Created
                    }
                    Err(error) => {
                        tracing::warn!(
                            "Skipping asset directory {}: {}",
                            relative.display(),
                            error
                        );
                        AssetStatus::Failed { error }
                    }
                };

                entries.push(AssetEntry {
                    path: relative,
                    kind: Some(NodeKind::Directory),
                    status,
                });
            } else {
                let node = AssetNode {
                    relative,
                    source: source.clone(),
                    destination: destination.clone(),
                    kind: NodeKind::File,
                };
                let copy = tokio::spawn(async move { fs::copy(source, destination).await });
                copies.push((node, copy));
            }
        }
    }

    for (node, copy) in copies {
        let result = match copy.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::other(e)),
        };

        let status = match result {
            Ok(bytes) => {
                tracing::debug!("Copied asset {}", node.relative.display());
                AssetStatus::Copied { bytes }
            }
            Err(e) => {
                let error = BuildError::write(&node.destination)(e);
                tracing::warn!("Failed to copy asset {}: {}", node.relative.display(), error);
                AssetStatus::Failed { error }
            }
        };

        entries.push(AssetEntry {
            path: node.relative,
            kind: Some(node.kind),
            status,
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));

    let report = MirrorReport {
        source: src_dir.to_path_buf(),
        destination: dest_dir.to_path_buf(),
        entries,
    };

    tracing::info!(
        "Mirrored {} files and {} directories into {}",
        report.files_copied(),
        report.directories_created(),
        dest_dir.display()
    );

    Ok(report)
}

/// Sibling of `src_dir` named `<name>-copy`.
pub fn default_mirror_destination(src_dir: &Path) -> PathBuf {
    let mut name = src_dir
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("files"));
    name.push(MIRROR_SUFFIX);
    src_dir.with_file_name(name)
}

async fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .await
        .is_ok_and(|meta| meta.file_type().is_symlink())
}

async fn list_dir(dir: &Path) -> io::Result<Vec<OsString>> {
    let mut read = fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = read.next_entry().await? {
        names.push(entry.file_name());
    }
    Ok(names)
}
