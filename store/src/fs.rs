//! Filesystem-backed object store.
//!
//! Keys are `/`-separated paths relative to a root directory. This is the
//! local stand-in for the bucket the pipeline runs against in production;
//! the analyzer only ever sees the [`ObjectStore`] trait.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::{ObjectInfo, ObjectStore};

/// Object store rooted at a local directory.
#[derive(Debug)]
pub struct DirStore {
    root: PathBuf,
    name: String,
}

impl DirStore {
    /// Opens a store over the given root directory.
    ///
    /// The store label (the "bucket" recorded in summaries) defaults to
    /// the directory's file name.
    pub fn open(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let name = root
            .file_name()
            .map_or_else(|| root.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self { root, name }
    }

    /// Overrides the store label.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.split('/').any(|part| part == "..") {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn collect_keys(&self, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_keys(&path, out)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(key);
            }
        }
        Ok(())
    }
}

impl ObjectStore for DirStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_text(&self, key: &str, max_bytes: usize) -> Result<String> {
        let path = self.path_for(key)?;
        let file = fs::File::open(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    key: key.to_string(),
                }
            } else {
                StoreError::Io {
                    key: key.to_string(),
                    source: e,
                }
            }
        })?;

        let mut buf = Vec::with_capacity(max_bytes.min(64 * 1024));
        file.take(max_bytes as u64)
            .read_to_end(&mut buf)
            .map_err(|e| StoreError::Io {
                key: key.to_string(),
                source: e,
            })?;

        let text = String::from_utf8_lossy(&buf).into_owned();
        Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
    }

    fn put_text(&self, key: &str, text: &str) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                key: key.to_string(),
                source: e,
            })?;
        }
        debug!(key, bytes = text.len(), "writing object");
        fs::write(&path, text).map_err(|e| StoreError::Io {
            key: key.to_string(),
            source: e,
        })
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        // Walk the deepest directory the prefix pins down, then apply the
        // prefix as a plain string filter so non-slash-aligned prefixes
        // behave like an object-store listing.
        let dir_part = prefix.rfind('/').map_or("", |idx| &prefix[..=idx]);
        let walk_root = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.root.join(dir_part)
        };
        if !walk_root.is_dir() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        self.collect_keys(&walk_root, &mut keys)
            .map_err(|e| StoreError::Io {
                key: prefix.to_string(),
                source: e,
            })?;

        let mut objects = Vec::new();
        for key in keys {
            if !key.starts_with(prefix) {
                continue;
            }
            let path = self.root.join(&key);
            let meta = fs::metadata(&path).map_err(|e| StoreError::Io {
                key: key.clone(),
                source: e,
            })?;
            let last_modified = meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();
            objects.push(ObjectInfo {
                key,
                last_modified,
                size: meta.len(),
            });
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_text_applies_byte_cap() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path());
        store.put_text("runs/r1/big.log", &"x".repeat(100)).unwrap();

        let text = store.get_text("runs/r1/big.log", 10).unwrap();
        assert_eq!(text.len(), 10);
    }

    #[test]
    fn test_get_text_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path());
        store.put_text("runs/r1/bom.log", "\u{feff}hello").unwrap();

        assert_eq!(store.get_text("runs/r1/bom.log", 1024).unwrap(), "hello");
    }

    #[test]
    fn test_try_get_text_distinguishes_absence() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path());

        assert!(store.try_get_text("runs/r1/missing.log", 1024).unwrap().is_none());
        assert!(matches!(
            store.get_text("runs/r1/missing.log", 1024),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_filters_by_string_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path());
        store
            .put_text("runs/r1/03-migration/impdp_a.log", "a")
            .unwrap();
        store
            .put_text("runs/r1/03-migration/impdp_b_retry2.log", "b")
            .unwrap();
        store
            .put_text("runs/r1/03-migration/notes/readme.txt", "n")
            .unwrap();
        store.put_text("runs/r1/04-validation/x.txt", "v").unwrap();

        let all = store.list("runs/r1/03-migration/").unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].key, "runs/r1/03-migration/impdp_a.log");

        let narrowed = store.list("runs/r1/03-migration/impdp_").unwrap();
        assert_eq!(narrowed.len(), 2);
    }

    #[test]
    fn test_parent_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::open(dir.path());
        assert!(matches!(
            store.get_text("../outside.log", 64),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
