//! Error kinds shared by the build stages.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

/// Errors that can occur during a build.
///
/// Whether an error is fatal depends on where it surfaces: destination
/// errors abort the build, while errors attached to a single fragment or
/// asset are recorded in that stage's report and the stage carries on.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Cannot access {}: {source}", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Output {} overlaps source {}", .output.display(), .input.display())]
    Overlap { output: PathBuf, input: PathBuf },
}

impl BuildError {
    pub(crate) fn access(path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Access { path, source }
    }

    pub(crate) fn read(path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Read { path, source }
    }

    pub(crate) fn write(path: &Path) -> impl FnOnce(io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Write { path, source }
    }

    /// Short name of the error kind, for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Access { .. } => "access",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Overlap { .. } => "overlap",
        }
    }

    /// Path the failed operation was working on.
    pub fn path(&self) -> &Path {
        match self {
            Self::Access { path, .. } | Self::Read { path, .. } | Self::Write { path, .. } => path,
            Self::Overlap { output, .. } => output,
        }
    }
}

// Reports are serialized for `--json` output; the message is all a reader needs.
impl Serialize for BuildError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_path_and_cause() {
        let err = BuildError::read(Path::new("styles/a.css"))(io::Error::new(
            io::ErrorKind::NotFound,
            "gone",
        ));

        assert_eq!(err.kind(), "read");
        assert_eq!(err.path(), Path::new("styles/a.css"));
        assert_eq!(err.to_string(), "Failed to read styles/a.css: gone");
    }

    #[test]
    fn serializes_as_message() {
        let err = BuildError::Overlap {
            output: PathBuf::from("site"),
            input: PathBuf::from("site/styles"),
        };

        let json = serde_json::to_string(&err).unwrap();

        assert_eq!(json, "\"Output site overlaps source site/styles\"");
    }
}
