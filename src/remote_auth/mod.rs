//! Chunked remote persistence of the messaging client's login session.

pub mod archive;
pub mod chunker;
pub mod junk;
pub mod kv;
pub mod lifecycle;
pub mod meta;
pub mod store;

pub use archive::ArchiveEntry;
pub use junk::{JunkPattern, default_junk_patterns};
pub use kv::{KvBackend, MemoryKvBackend, RetryConfig, UpstashRestBackend};
pub use lifecycle::RemoteAuth;
pub use meta::{MetaRecord, SessionKeys};
pub use store::{
    RemoteSessionStore, RestoreOutcome, SaveReport, SessionState, StorageMode, StoreOptions,
};
