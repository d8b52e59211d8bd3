//! Object-store boundary for upgrade evidence audits.
//!
//! The analyzer never talks to storage directly: the orchestrating
//! handler holds an [`ObjectStore`] implementation and threads plain text
//! into the pure analysis functions. This crate defines that boundary:
//!
//! - [`ObjectStore`] — bounded reads, writes, and prefix listing over a
//!   hierarchical key namespace.
//! - [`DirStore`] — the filesystem implementation used by the CLI and by
//!   tests.
//! - [`keys`] — run-prefix derivation and well-known key construction.
//!
//! Reads are always byte-capped: a cap is a hard truncation, not a
//! retryable condition. Absence is data, not failure: use
//! [`ObjectStore::try_get_text`] wherever a missing artifact should flow
//! into scoring instead of aborting the invocation.
//!
//! # Example
//!
//! ```
//! use upgrade_audit_store::{DirStore, ObjectStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = DirStore::open(dir.path()).with_name("upgrade-artifacts");
//! store.put_text("runs/r1/02-precheck/precheck.log", "clean").unwrap();
//!
//! assert_eq!(store.name(), "upgrade-artifacts");
//! assert_eq!(
//!     store.try_get_text("runs/r1/02-precheck/precheck.log", 1024).unwrap(),
//!     Some("clean".to_string())
//! );
//! assert_eq!(store.try_get_text("runs/r1/absent.log", 1024).unwrap(), None);
//! ```

mod error;
pub mod fs;
pub mod keys;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use error::{Result, StoreError};
pub use fs::DirStore;

/// Metadata for one listed object.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Blob operations over a hierarchical key namespace.
///
/// Implementations are assumed reliable key-value stores; pagination and
/// retry concerns stay behind this boundary.
pub trait ObjectStore {
    /// Store label recorded as the "bucket" in summaries and outcomes.
    fn name(&self) -> &str;

    /// Reads an object as text, truncated at `max_bytes` (lossy UTF-8,
    /// leading BOM stripped).
    fn get_text(&self, key: &str, max_bytes: usize) -> Result<String>;

    /// Writes an object, replacing any previous content.
    fn put_text(&self, key: &str, text: &str) -> Result<()>;

    /// Lists objects whose keys start with `prefix`, sorted by key.
    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    /// Like [`get_text`](Self::get_text), but absence yields `None` and
    /// every other fault still propagates.
    fn try_get_text(&self, key: &str, max_bytes: usize) -> Result<Option<String>> {
        match self.get_text(key, max_bytes) {
            Ok(text) => Ok(Some(text)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Serializes a value as pretty-printed JSON and writes it to the store.
pub fn put_json<T: Serialize>(store: &dyn ObjectStore, key: &str, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    store.put_text(key, &text)
}
