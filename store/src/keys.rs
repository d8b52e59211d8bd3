//! Run-scoped key derivation helpers.

use upgrade_audit_core::policy;

use crate::error::{Result, StoreError};

/// Derives the run prefix from a metrics trigger key.
///
/// The key must end with the fixed metrics suffix; the prefix keeps its
/// trailing slash so relative keys append cleanly.
///
/// # Examples
///
/// ```
/// use upgrade_audit_store::keys::derive_run_prefix;
///
/// let prefix = derive_run_prefix("runs/run-001/00-metadata/metrics.json").unwrap();
/// assert_eq!(prefix, "runs/run-001/");
///
/// assert!(derive_run_prefix("runs/run-001/notes.txt").is_err());
/// ```
pub fn derive_run_prefix(metrics_key: &str) -> Result<String> {
    let slash_suffix = format!("/{}", policy::METRICS_KEY_SUFFIX);
    if !metrics_key.ends_with(&slash_suffix) {
        return Err(StoreError::InvalidKey(format!(
            "expected suffix '{slash_suffix}', got: {metrics_key}"
        )));
    }
    Ok(metrics_key[..metrics_key.len() - policy::METRICS_KEY_SUFFIX.len()].to_string())
}

/// Builds the metrics trigger key for a bare run id.
pub fn metrics_key_for_run(run_id: &str) -> String {
    format!("runs/{run_id}/{}", policy::METRICS_KEY_SUFFIX)
}

/// Strips the run prefix from an absolute key, yielding the relative key.
///
/// Keys outside the prefix are returned unchanged.
pub fn strip_run_prefix<'a>(key: &'a str, run_prefix: &str) -> &'a str {
    key.strip_prefix(run_prefix).unwrap_or(key)
}
