//! Plain file sink
//!
//! Each key becomes one file under the root folder. Last writer wins.

use crate::storage::traits::{Sink, SinkError, SinkResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Writes artifacts as files under a root folder
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    /// Creates a sink rooted at `root`; the folder is created on first save
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn save(&mut self, key: &str, value: &[u8]) -> SinkResult<()> {
        let io_err = |source| SinkError::Io {
            key: key.to_string(),
            source,
        };

        tokio::fs::create_dir_all(&self.root).await.map_err(io_err)?;
        tokio::fs::write(self.root.join(key), value)
            .await
            .map_err(io_err)?;

        tracing::debug!("Wrote {} ({} bytes)", key, value.len());
        Ok(())
    }
}
