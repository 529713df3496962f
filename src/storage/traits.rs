//! Sink traits and error types
//!
//! This module defines the uniform `save(key, value)` contract shared by the
//! file and key-value sinks, and the bucket interface the key-value sink is
//! written against.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while persisting an artifact
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error writing {key}: {source}")]
    Io {
        key: String,
        source: std::io::Error,
    },

    #[error("Store error for {key}: {source}")]
    Store { key: String, source: KvError },

    #[error("Store connection error: {0}")]
    Connect(String),
}

/// Errors reported by a versioned key-value bucket
#[derive(Debug, Error)]
pub enum KvError {
    /// The write's expected revision did not match the key's current one
    #[error("wrong last revision for key {key}")]
    Conflict { key: String },

    #[error("key not found: {key}")]
    NotFound { key: String },

    #[error("{0}")]
    Api(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Result type for bucket operations
pub type KvResult<T> = Result<T, KvError>;

/// A destination for named artifacts
#[async_trait]
pub trait Sink: Send {
    /// Stores `value` under `key`, replacing any previous value
    async fn save(&mut self, key: &str, value: &[u8]) -> SinkResult<()>;
}

/// A key-value bucket with per-key revisions (optimistic concurrency)
///
/// Revisions are assigned by the bucket; callers only ever pass back a
/// revision they previously read.
#[async_trait]
pub trait KvBucket: Send + Sync {
    /// Writes `key` only if it has never been written
    ///
    /// Returns the new revision, or `KvError::Conflict` if the key exists.
    async fn create(&self, key: &str, value: Bytes) -> KvResult<u64>;

    /// Current revision of `key`, or `None` if it does not exist
    async fn revision(&self, key: &str) -> KvResult<Option<u64>>;

    /// Writes `key` only if its current revision equals `expected`
    ///
    /// Returns the new revision, or `KvError::Conflict` on mismatch.
    async fn update(&self, key: &str, value: Bytes, expected: u64) -> KvResult<u64>;

    /// Releases the underlying connection
    async fn close(&self) -> KvResult<()> {
        Ok(())
    }
}
