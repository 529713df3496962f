//! Storage module for persisting crawl artifacts
//!
//! This module holds the two sinks a run writes to:
//! - `FileSink`: JSON files under a local folder
//! - `VersionedKvSink`: a revisioned key-value bucket with conflict-aware
//!   create-or-update writes (NATS JetStream in production, in-memory in tests)
//!
//! plus the key naming rules both sinks share.

mod file;
mod keys;
mod kv;
mod memory;
mod nats;
mod traits;

pub use file::FileSink;
pub use keys::{assign_record_keys, sanitize_key, KeyLayout, FILE_LAYOUT, KV_LAYOUT};
pub use kv::VersionedKvSink;
pub use memory::MemoryBucket;
pub use nats::NatsBucket;
pub use traits::{KvBucket, KvError, KvResult, Sink, SinkError, SinkResult};
