//! Concurrent file reads consumed in a fixed order.

use std::io;
use std::path::PathBuf;

use tokio::task::JoinHandle;

/// A file read started in the background.
///
/// Reads run concurrently as soon as they are spawned; callers await them
/// one by one in whatever order the output must follow.
pub(crate) struct ReadAhead(JoinHandle<io::Result<Vec<u8>>>);

impl ReadAhead {
    pub(crate) fn spawn(path: PathBuf) -> Self {
        Self(tokio::spawn(async move { tokio::fs::read(path).await }))
    }

    /// Wait for the whole file.
    pub(crate) async fn finish(self) -> io::Result<Vec<u8>> {
        self.0.await.map_err(io::Error::other)?
    }
}
