//! Deterministic selection of the authoritative import attempt.

use tracing::debug;

use upgrade_audit_core::{AttemptCandidate, SelectionReason, policy};

use crate::extract;

/// Outcome of selecting among import-attempt candidates.
#[derive(Debug, Clone)]
pub struct AttemptSelection {
    /// The authoritative candidate, when any exist.
    pub selected: Option<AttemptCandidate>,
    /// How many candidates matched the naming convention.
    pub attempt_count: usize,
    /// All candidates, in listing order, for the audit trail.
    pub candidates: Vec<AttemptCandidate>,
    pub reason: SelectionReason,
}

/// Builds an [`AttemptCandidate`] from a listed object when its filename
/// matches the import-log convention (`impdp_*.log`).
pub fn candidate_from_listing(
    key_rel: &str,
    last_modified: chrono::DateTime<chrono::Utc>,
    size: Option<u64>,
) -> Option<AttemptCandidate> {
    let base_name = key_rel.rsplit('/').next().unwrap_or(key_rel);
    if !base_name.starts_with(policy::IMPORT_LOG_BASENAME_PREFIX)
        || !base_name.ends_with(policy::IMPORT_LOG_BASENAME_SUFFIX)
    {
        return None;
    }
    Some(AttemptCandidate {
        key: key_rel.to_string(),
        base_name: base_name.to_string(),
        retry_number: extract::retry_number(base_name),
        last_modified,
        size,
    })
}

/// Picks the final attempt: ascending sort by `(retry_number,
/// last_modified)`, last element wins.
///
/// When no candidate encodes a retry number the winner is still the same
/// object, but the reason is reported as a modification-time selection for
/// auditability. Equal maximum retry numbers tie-break silently on the
/// latest modification time; uniqueness is not validated.
pub fn select_final_attempt(candidates: Vec<AttemptCandidate>) -> AttemptSelection {
    if candidates.is_empty() {
        return AttemptSelection {
            selected: None,
            attempt_count: 0,
            candidates,
            reason: SelectionReason::NoCandidates,
        };
    }

    let attempt_count = candidates.len();
    let max_retry = candidates.iter().map(|c| c.retry_number).max().unwrap_or(0);

    let mut ranked = candidates.clone();
    ranked.sort_by(|a, b| {
        (a.retry_number, a.last_modified).cmp(&(b.retry_number, b.last_modified))
    });
    let selected = ranked.pop();

    let reason = if max_retry > 0 {
        SelectionReason::RetryNumberThenLastModified
    } else {
        SelectionReason::LastModified
    };
    if let Some(sel) = selected.as_ref() {
        debug!(key = %sel.key, retry = sel.retry_number, reason = %reason, "selected import attempt");
    }

    AttemptSelection {
        selected,
        attempt_count,
        candidates,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn cand(key: &str, retry: u32, hour: u32) -> AttemptCandidate {
        AttemptCandidate {
            key: key.to_string(),
            base_name: key.rsplit('/').next().unwrap().to_string(),
            retry_number: retry,
            last_modified: Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap(),
            size: Some(1024),
        }
    }

    #[test]
    fn test_candidate_filter_honors_naming_convention() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        assert!(candidate_from_listing("03-migration/impdp_legacy.log", ts, None).is_some());
        assert!(candidate_from_listing("03-migration/expdp_legacy_18c.log", ts, None).is_none());
        assert!(candidate_from_listing("03-migration/impdp_legacy.txt", ts, None).is_none());
    }

    #[test]
    fn test_candidate_derives_retry_number() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let c = candidate_from_listing("03-migration/impdp_legacy_retry2.log", ts, Some(7))
            .expect("should match convention");
        assert_eq!(c.retry_number, 2);
        assert_eq!(c.base_name, "impdp_legacy_retry2.log");
        assert_eq!(c.size, Some(7));
    }

    #[test]
    fn test_select_highest_retry_then_latest_timestamp() {
        let selection = select_final_attempt(vec![
            cand("03-migration/impdp_a.log", 0, 10),
            cand("03-migration/impdp_b_retry2.log", 2, 9),
            cand("03-migration/impdp_c_retry2.log", 2, 11),
        ]);
        let selected = selection.selected.expect("one candidate must win");
        assert_eq!(selected.key, "03-migration/impdp_c_retry2.log");
        assert_eq!(selection.attempt_count, 3);
        assert_eq!(
            selection.reason,
            SelectionReason::RetryNumberThenLastModified
        );
    }

    #[test]
    fn test_select_without_retry_numbers_reports_lastmodified() {
        let selection = select_final_attempt(vec![
            cand("03-migration/impdp_a.log", 0, 10),
            cand("03-migration/impdp_b.log", 0, 12),
        ]);
        assert_eq!(
            selection.selected.as_ref().unwrap().key,
            "03-migration/impdp_b.log"
        );
        assert_eq!(selection.reason, SelectionReason::LastModified);
    }

    #[test]
    fn test_select_empty_listing() {
        let selection = select_final_attempt(Vec::new());
        assert!(selection.selected.is_none());
        assert_eq!(selection.attempt_count, 0);
        assert_eq!(selection.reason, SelectionReason::NoCandidates);
    }
}
