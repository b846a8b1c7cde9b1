//! # IntentSim IO
//!
//! Persistence layer for the IntentSim engine.
//!
//! This crate provides:
//! - Structured error handling with custom error types
//! - Serialization helpers (JSON, gzip JSON, rkyv)
//! - Key-value state stores (in-memory and on-disk)
//! - Restore-or-initialize with corrupt-state fallback
//! - A JSONL journal of simulation events

/// Error types and result aliases for I/O operations
pub mod error;
/// JSONL event journal
pub mod history;
/// State encoding and restore-or-initialize
pub mod persistence;
/// Validated serialization helpers for JSON and gzip JSON
pub mod serialization;
/// Key-value state stores
pub mod storage;

pub use error::{IoError, Result};
pub use history::{EventJournal, JournalEntry};
pub use persistence::{load_or_initialize, Restored, StateFormat};
pub use serialization::{from_json, to_json, to_json_pretty, write_json_file};
pub use storage::{FileStore, MemoryStore, StateStore};
