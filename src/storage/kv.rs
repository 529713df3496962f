//! Versioned key-value sink
//!
//! Writes go through create-then-update: a brand new key is created, an
//! existing key is updated against the revision just read. The conflict path
//! runs once; a second conflict is reported, not retried.

use crate::config::KvConfig;
use crate::storage::nats::NatsBucket;
use crate::storage::traits::{KvBucket, KvError, Sink, SinkError, SinkResult};
use async_trait::async_trait;
use bytes::Bytes;

/// Sink writing to a [`KvBucket`] with optimistic concurrency
pub struct VersionedKvSink<B> {
    bucket: B,
}

impl VersionedKvSink<NatsBucket> {
    /// Connects to NATS and binds to (or creates) the configured bucket
    pub async fn connect(config: &KvConfig) -> SinkResult<Self> {
        let bucket = NatsBucket::connect(config).await?;
        Ok(Self::new(bucket))
    }
}

impl<B: KvBucket> VersionedKvSink<B> {
    pub fn new(bucket: B) -> Self {
        Self { bucket }
    }

    pub fn bucket(&self) -> &B {
        &self.bucket
    }

    /// Flushes pending writes and drops the bucket connection
    pub async fn close(self) -> SinkResult<()> {
        let result = self
            .bucket
            .close()
            .await
            .map_err(|e| SinkError::Connect(e.to_string()));
        drop(self.bucket);
        result
    }

    /// Read-current-revision-then-update for a key that already exists
    async fn overwrite(&self, key: &str, value: Bytes) -> Result<u64, KvError> {
        let revision = self
            .bucket
            .revision(key)
            .await?
            .ok_or_else(|| KvError::NotFound {
                key: key.to_string(),
            })?;

        self.bucket.update(key, value, revision).await
    }
}

#[async_trait]
impl<B: KvBucket> Sink for VersionedKvSink<B> {
    async fn save(&mut self, key: &str, value: &[u8]) -> SinkResult<()> {
        let value = Bytes::copy_from_slice(value);

        let result = match self.bucket.create(key, value.clone()).await {
            Ok(revision) => {
                tracing::debug!("Created {} at revision {}", key, revision);
                return Ok(());
            }
            Err(KvError::Conflict { .. }) => self.overwrite(key, value).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(revision) => {
                tracing::debug!("Updated {} to revision {}", key, revision);
                Ok(())
            }
            Err(source) => {
                tracing::error!("Failed to store {}: {}", key, source);
                Err(SinkError::Store {
                    key: key.to_string(),
                    source,
                })
            }
        }
    }
}
