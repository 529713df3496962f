//! NATS JetStream key-value bucket
//!
//! Wraps an `async_nats` key-value store behind [`KvBucket`], mapping the
//! store's "already exists" and "wrong last revision" errors onto
//! `KvError::Conflict`.

use crate::config::KvConfig;
use crate::storage::traits::{KvBucket, KvError, KvResult, SinkError, SinkResult};
use async_nats::jetstream::context::{
    GetStreamError, GetStreamErrorKind, KeyValueError, KeyValueErrorKind,
};
use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error as _;
use std::path::PathBuf;

/// A JetStream key-value bucket and the client connection backing it
pub struct NatsBucket {
    client: async_nats::Client,
    store: kv::Store,
}

impl NatsBucket {
    /// Connects to the configured server and binds to the bucket
    ///
    /// The bucket is created with default settings if it does not exist yet.
    pub async fn connect(config: &KvConfig) -> SinkResult<Self> {
        let options = match &config.creds_file {
            Some(path) => async_nats::ConnectOptions::with_credentials_file(PathBuf::from(path))
                .await
                .map_err(|e| {
                    SinkError::Connect(format!("failed to read credentials {}: {}", path, e))
                })?,
            None => async_nats::ConnectOptions::new(),
        };

        tracing::info!("Connecting to NATS at {}", config.server);
        let client = options
            .connect(config.server.as_str())
            .await
            .map_err(|e| SinkError::Connect(format!("{}: {}", config.server, e)))?;

        let js = jetstream::new(client.clone());
        let store = match js.get_key_value(config.bucket.as_str()).await {
            Ok(store) => store,
            Err(e) if is_bucket_not_found(&e) => {
                tracing::info!("Bucket {} does not exist, creating it", config.bucket);
                js.create_key_value(kv::Config {
                    bucket: config.bucket.clone(),
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    SinkError::Connect(format!("failed to create bucket {}: {}", config.bucket, e))
                })?
            }
            Err(e) => {
                return Err(SinkError::Connect(format!(
                    "failed to open bucket {}: {}",
                    config.bucket, e
                )))
            }
        };

        Ok(Self { client, store })
    }
}

/// True only when the bucket's backing stream does not exist
///
/// Timeouts, permission errors and the like must not trigger a create.
fn is_bucket_not_found(error: &KeyValueError) -> bool {
    if error.kind() != KeyValueErrorKind::GetBucket {
        return false;
    }

    error
        .source()
        .and_then(|source| source.downcast_ref::<GetStreamError>())
        .map(|stream_error| stream_not_found(&stream_error.kind()))
        .unwrap_or(false)
}

fn stream_not_found(kind: &GetStreamErrorKind) -> bool {
    matches!(
        kind,
        GetStreamErrorKind::JetStream(err) if err.error_code() == jetstream::ErrorCode::STREAM_NOT_FOUND
    )
}

#[async_trait]
impl KvBucket for NatsBucket {
    async fn create(&self, key: &str, value: Bytes) -> KvResult<u64> {
        self.store.create(key, value).await.map_err(|e| {
            if matches!(e.kind(), kv::CreateErrorKind::AlreadyExists) {
                KvError::Conflict {
                    key: key.to_string(),
                }
            } else {
                KvError::Api(e.to_string())
            }
        })
    }

    async fn revision(&self, key: &str) -> KvResult<Option<u64>> {
        let entry = self
            .store
            .entry(key)
            .await
            .map_err(|e| KvError::Api(e.to_string()))?;
        Ok(entry.map(|e| e.revision))
    }

    async fn update(&self, key: &str, value: Bytes, expected: u64) -> KvResult<u64> {
        self.store.update(key, value, expected).await.map_err(|e| {
            if matches!(e.kind(), kv::UpdateErrorKind::WrongLastRevision) {
                KvError::Conflict {
                    key: key.to_string(),
                }
            } else {
                KvError::Api(e.to_string())
            }
        })
    }

    async fn close(&self) -> KvResult<()> {
        self.client
            .flush()
            .await
            .map_err(|e| KvError::Api(e.to_string()))
    }
}
