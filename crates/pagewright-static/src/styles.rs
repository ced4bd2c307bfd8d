//! Stylesheet bundling.
//!
//! Every `.css` file directly inside the styles directory is appended to a
//! single bundle, in the order the directory listing returned them, each
//! followed by one line separator. Reads run ahead concurrently but the bundle
//! has a single writer that consumes them strictly in listing order, so
//! fragments never interleave.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::BuildError;
use crate::read_ahead::ReadAhead;

/// Separator written after each fragment.
pub const LINE_SEPARATOR: &[u8] = b"\n";

/// Extension a fragment must carry to be bundled.
pub const STYLE_EXTENSION: &str = "css";

/// File name used by [`bundle_styles`].
pub const MERGED_BUNDLE_NAME: &str = "bundle.css";

/// A fragment followed by its separator, ready to be written in sequence.
pub fn separated(chunk: &[u8]) -> [&[u8]; 2] {
    [chunk, LINE_SEPARATOR]
}

/// Why an entry of the styles directory was left out of the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    WrongExtension,
    NotRegularFile,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongExtension => write!(f, "not a .{} file", STYLE_EXTENSION),
            Self::NotRegularFile => write!(f, "not a regular file"),
        }
    }
}

/// An entry of the styles directory and its validity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssFragment {
    pub path: PathBuf,
    pub rejection: Option<RejectReason>,
}

impl CssFragment {
    /// Classify an entry from its path and whether it is a regular file.
    pub fn classify(path: PathBuf, is_file: bool) -> Self {
        let rejection = if !is_file {
            Some(RejectReason::NotRegularFile)
        } else if path.extension().and_then(|e| e.to_str()) != Some(STYLE_EXTENSION) {
            Some(RejectReason::WrongExtension)
        } else {
            None
        };

        Self { path, rejection }
    }

    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Outcome for a single styles directory entry.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FragmentStatus {
    /// Content was appended to the bundle
    Accepted { bytes: usize },

    /// Entry did not qualify as a fragment
    Rejected { reason: RejectReason },

    /// Entry qualified (or could not be inspected) but reading it failed
    Failed { error: BuildError },
}

/// A styles directory entry with its outcome.
#[derive(Debug, Serialize)]
pub struct FragmentEntry {
    /// File name as listed
    pub name: String,

    #[serde(flatten)]
    pub status: FragmentStatus,
}

/// Result of bundling a styles directory.
#[derive(Debug, Serialize)]
pub struct BundleReport {
    /// Bundle file written
    pub output: PathBuf,

    /// Every listed entry, in listing order
    pub entries: Vec<FragmentEntry>,

    /// Total bytes written, separators included
    pub bytes_written: usize,
}

impl BundleReport {
    /// Names of the fragments that made it into the bundle, in bundle order.
    pub fn accepted(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.status, FragmentStatus::Accepted { .. }))
            .map(|e| e.name.as_str())
    }

    pub fn rejected(&self) -> impl Iterator<Item = (&str, RejectReason)> {
        self.entries.iter().filter_map(|e| match e.status {
            FragmentStatus::Rejected { reason } => Some((e.name.as_str(), reason)),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &BuildError)> {
        self.entries.iter().filter_map(|e| match &e.status {
            FragmentStatus::Failed { error } => Some((e.name.as_str(), error)),
            _ => None,
        })
    }
}

/// A listed entry waiting for its turn at the writer.
enum Pending {
    Read(ReadAhead, PathBuf),
    Done(FragmentStatus),
}

/// Bundle the `.css` files of `styles_dir` into `out_file`.
///
/// Resolves once every byte is flushed and synced to `out_file`. Entries that
/// are not `.css` regular files are reported as rejected; entries that cannot
/// be inspected or read are reported as failed. Neither stops the remaining
/// entries. Failing to list `styles_dir` or to write `out_file` fails the
/// whole bundle.
pub async fn bundle(styles_dir: &Path, out_file: &Path) -> Result<BundleReport, BuildError> {
    let fragments = discover(styles_dir).await?;

    let file = fs::File::create(out_file)
        .await
        .map_err(BuildError::write(out_file))?;
    let mut writer = BufWriter::new(file);

    let pending: Vec<(String, Pending)> = fragments
        .into_iter()
        .map(|(name, fragment)| {
            let pending = match fragment {
                Ok(fragment) => match fragment.rejection {
                    None => Pending::Read(ReadAhead::spawn(fragment.path.clone()), fragment.path),
                    Some(reason) => Pending::Done(FragmentStatus::Rejected { reason }),
                },
                Err(error) => Pending::Done(FragmentStatus::Failed { error }),
            };
            (name, pending)
        })
        .collect();

    let mut entries = Vec::with_capacity(pending.len());
    let mut bytes_written = 0;

    for (name, pending) in pending {
        let status = match pending {
            Pending::Read(read, path) => match read.finish().await {
                Ok(content) => {
                    for chunk in separated(&content) {
                        writer
                            .write_all(chunk)
                            .await
                            .map_err(BuildError::write(out_file))?;
                    }
                    bytes_written += content.len() + LINE_SEPARATOR.len();
                    tracing::debug!("Bundled stylesheet {}", name);
                    FragmentStatus::Accepted {
                        bytes: content.len(),
                    }
                }
                Err(e) => {
                    let error = BuildError::read(&path)(e);
                    tracing::warn!("Skipping stylesheet {}: {}", name, error);
                    FragmentStatus::Failed { error }
                }
            },
            Pending::Done(status) => {
                match &status {
                    FragmentStatus::Rejected { reason } => {
                        tracing::warn!("Rejected stylesheet {}: {}", name, reason);
                    }
                    FragmentStatus::Failed { error } => {
                        tracing::warn!("Skipping stylesheet {}: {}", name, error);
                    }
                    FragmentStatus::Accepted { .. } => {}
                }
                status
            }
        };

        entries.push(FragmentEntry { name, status });
    }

    writer.flush().await.map_err(BuildError::write(out_file))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(BuildError::write(out_file))?;

    let report = BundleReport {
        output: out_file.to_path_buf(),
        entries,
        bytes_written,
    };

    tracing::info!(
        "Bundled {} stylesheets into {}",
        report.accepted().count(),
        out_file.display()
    );

    Ok(report)
}

/// Bundle `styles_dir` into `dest_dir/bundle.css`, leaving the rest of
/// `dest_dir` alone.
///
/// Creates `dest_dir` when missing and replaces a previous bundle.
pub async fn bundle_styles(styles_dir: &Path, dest_dir: &Path) -> Result<BundleReport, BuildError> {
    fs::create_dir_all(dest_dir)
        .await
        .map_err(BuildError::access(dest_dir))?;

    let out_file = dest_dir.join(MERGED_BUNDLE_NAME);

    match fs::symlink_metadata(&out_file).await {
        Ok(meta) => {
            let removed = if meta.is_dir() {
                fs::remove_dir_all(&out_file).await
            } else {
                fs::remove_file(&out_file).await
            };
            removed.map_err(BuildError::access(&out_file))?;
            tracing::info!("Replacing existing bundle {}", out_file.display());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(BuildError::access(&out_file)(e)),
    }

    bundle(styles_dir, &out_file).await
}

/// List `styles_dir` and classify each entry, keeping listing order.
async fn discover(
    styles_dir: &Path,
) -> Result<Vec<(String, Result<CssFragment, BuildError>)>, BuildError> {
    let mut dir = fs::read_dir(styles_dir)
        .await
        .map_err(BuildError::read(styles_dir))?;

    let mut fragments = Vec::new();

    while let Some(entry) = dir
        .next_entry()
        .await
        .map_err(BuildError::read(styles_dir))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();

        // Follow symlinks so a linked stylesheet counts as a regular file.
        let fragment = match fs::metadata(&path).await {
            Ok(meta) => Ok(CssFragment::classify(path, meta.is_file())),
            Err(e) => Err(BuildError::read(&path)(e)),
        };

        fragments.push((name, fragment));
    }

    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs as std_fs;
    use tempfile::tempdir;

    /// Listing order as the platform reports it.
    fn listing(dir: &Path) -> Vec<String> {
        std_fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn appends_one_separator() {
        let chunks = separated(b"a { color: red; }");
        assert_eq!(chunks.concat(), b"a { color: red; }\n".to_vec());

        assert_eq!(separated(b"").concat(), b"\n".to_vec());
    }

    #[test]
    fn classifies_entries() {
        let css = CssFragment::classify(PathBuf::from("styles/a.css"), true);
        assert!(css.is_valid());

        let txt = CssFragment::classify(PathBuf::from("styles/b.txt"), true);
        assert_eq!(txt.rejection, Some(RejectReason::WrongExtension));

        let upper = CssFragment::classify(PathBuf::from("styles/c.CSS"), true);
        assert_eq!(upper.rejection, Some(RejectReason::WrongExtension));

        let dir = CssFragment::classify(PathBuf::from("styles/vendor.css"), false);
        assert_eq!(dir.rejection, Some(RejectReason::NotRegularFile));
    }

    #[tokio::test]
    async fn bundles_css_in_listing_order() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("styles");
        std_fs::create_dir_all(&styles).unwrap();
        std_fs::write(styles.join("a.css"), "a { color: red; }").unwrap();
        std_fs::write(styles.join("b.txt"), "not css").unwrap();
        std_fs::write(styles.join("c.css"), ".c {}\n").unwrap();

        let out = temp.path().join("style.css");
        let report = bundle(&styles, &out).await.unwrap();

        let mut expected = String::new();
        for name in listing(&styles) {
            if name.ends_with(".css") {
                expected.push_str(&std_fs::read_to_string(styles.join(&name)).unwrap());
                expected.push('\n');
            }
        }

        assert_eq!(std_fs::read_to_string(&out).unwrap(), expected);
        assert_eq!(report.bytes_written, expected.len());

        let accepted: Vec<&str> = report.accepted().collect();
        let expected_order: Vec<String> = listing(&styles)
            .into_iter()
            .filter(|n| n.ends_with(".css"))
            .collect();
        assert_eq!(accepted, expected_order);

        let rejected: Vec<_> = report.rejected().collect();
        assert_eq!(rejected, vec![("b.txt", RejectReason::WrongExtension)]);
        assert_eq!(report.failed().count(), 0);
    }

    #[tokio::test]
    async fn keeps_order_with_many_fragments() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("styles");
        std_fs::create_dir_all(&styles).unwrap();

        // Uneven sizes so reads finish out of order.
        for i in 0..40 {
            let body = format!(".f{} {{}}", i).repeat(if i % 3 == 0 { 4000 } else { 1 });
            std_fs::write(styles.join(format!("f{:02}.css", i)), body).unwrap();
        }

        let out = temp.path().join("style.css");
        bundle(&styles, &out).await.unwrap();

        let expected: String = listing(&styles)
            .iter()
            .map(|name| std_fs::read_to_string(styles.join(name)).unwrap() + "\n")
            .collect();

        assert_eq!(std_fs::read_to_string(&out).unwrap(), expected);
    }

    #[tokio::test]
    async fn rejects_directories() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("styles");
        std_fs::create_dir_all(styles.join("vendor.css")).unwrap();
        std_fs::write(styles.join("main.css"), "main {}").unwrap();

        let out = temp.path().join("style.css");
        let report = bundle(&styles, &out).await.unwrap();

        assert_eq!(std_fs::read_to_string(&out).unwrap(), "main {}\n");
        let rejected: Vec<_> = report.rejected().collect();
        assert_eq!(rejected, vec![("vendor.css", RejectReason::NotRegularFile)]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn records_unreadable_fragment_and_keeps_siblings() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("styles");
        std_fs::create_dir_all(&styles).unwrap();
        std_fs::write(styles.join("a.css"), "a{}").unwrap();
        std::os::unix::fs::symlink(temp.path().join("missing.css"), styles.join("x.css")).unwrap();
        std_fs::write(styles.join("c.css"), "c{}").unwrap();

        let out = temp.path().join("style.css");
        let report = bundle(&styles, &out).await.unwrap();

        let expected: String = listing(&styles)
            .into_iter()
            .filter(|name| name != "x.css")
            .map(|name| format!("{}{{}}\n", &name[..1]))
            .collect();
        assert_eq!(std_fs::read_to_string(&out).unwrap(), expected);

        let failed: Vec<_> = report.failed().map(|(name, _)| name).collect();
        assert_eq!(failed, vec!["x.css"]);
        assert_eq!(report.accepted().count(), 2);
    }

    #[tokio::test]
    async fn writes_empty_bundle_for_empty_directory() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("styles");
        std_fs::create_dir_all(&styles).unwrap();

        let out = temp.path().join("style.css");
        let report = bundle(&styles, &out).await.unwrap();

        assert!(report.entries.is_empty());
        assert_eq!(std_fs::read_to_string(&out).unwrap(), "");
    }

    #[tokio::test]
    async fn fails_on_missing_styles_directory() {
        let temp = tempdir().unwrap();

        let err = bundle(&temp.path().join("missing"), &temp.path().join("style.css"))
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Read { .. }));
    }

    #[tokio::test]
    async fn merges_into_existing_destination() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("styles");
        let dest = temp.path().join("project-dist");
        std_fs::create_dir_all(&styles).unwrap();
        std_fs::create_dir_all(&dest).unwrap();
        std_fs::write(styles.join("only.css"), "body {}").unwrap();
        std_fs::write(dest.join(MERGED_BUNDLE_NAME), "stale").unwrap();
        std_fs::write(dest.join("keep.txt"), "keep").unwrap();

        let report = bundle_styles(&styles, &dest).await.unwrap();

        assert_eq!(report.output, dest.join(MERGED_BUNDLE_NAME));
        assert_eq!(
            std_fs::read_to_string(dest.join(MERGED_BUNDLE_NAME)).unwrap(),
            "body {}\n"
        );
        assert_eq!(std_fs::read_to_string(dest.join("keep.txt")).unwrap(), "keep");
    }

    #[tokio::test]
    async fn creates_missing_merge_destination() {
        let temp = tempdir().unwrap();
        let styles = temp.path().join("styles");
        std_fs::create_dir_all(&styles).unwrap();
        std_fs::write(styles.join("a.css"), "a {}").unwrap();

        let dest = temp.path().join("nested/dist");
        bundle_styles(&styles, &dest).await.unwrap();

        assert!(dest.join(MERGED_BUNDLE_NAME).is_file());
    }
}
