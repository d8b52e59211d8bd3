//! Per-artifact log classification.

use tracing::debug;

use upgrade_audit_core::{CompletionState, LogResult, PhaseStatus};

use crate::extract;

/// Derives a [`LogResult`] for one artifact.
///
/// Absent text produces the `found = false` record with its invariants
/// (empty code map, completion state NONE). Present text runs the ORA
/// counter and the completion cascade.
pub fn classify_log(key_rel: &str, text: Option<String>) -> LogResult {
    let Some(text) = text else {
        return LogResult::missing(key_rel);
    };

    let ora_counts = extract::ora_counts(&text);
    let (completion_state, error_count) = extract::completion_state(&text);
    debug!(
        key = key_rel,
        codes = ora_counts.len(),
        state = %completion_state,
        "classified log artifact"
    );

    LogResult {
        key_rel: key_rel.to_string(),
        found: true,
        text: Some(text),
        ora_counts,
        completion_state,
        error_count,
    }
}

/// Per-phase Data Pump verdict for a (possibly absent) log.
///
/// Fatal codes dominate the completion marker; a SUCCESS marker without
/// fatal codes is the only PASS.
pub fn phase_status(log: Option<&LogResult>) -> PhaseStatus {
    let Some(log) = log.filter(|lr| lr.found) else {
        return PhaseStatus::Missing;
    };
    if log.has_fatal_code() {
        return PhaseStatus::Fail;
    }
    match log.completion_state {
        CompletionState::Success => PhaseStatus::Pass,
        _ => PhaseStatus::Warn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_absent_log() {
        let lr = classify_log("02-precheck/precheck.log", None);
        assert!(!lr.found);
        assert!(lr.ora_counts.is_empty());
        assert_eq!(lr.completion_state, CompletionState::None);
    }

    #[test]
    fn test_classify_present_log() {
        let text = "ORA-39082: warning\nJob successfully completed\n".to_string();
        let lr = classify_log("03-migration/impdp_legacy.log", Some(text));
        assert!(lr.found);
        assert_eq!(lr.ora_counts.get("ORA-39082"), Some(&1));
        assert_eq!(lr.completion_state, CompletionState::Success);
        assert_eq!(lr.error_count, Some(0));
    }

    #[test]
    fn test_phase_status_precedence() {
        assert_eq!(phase_status(None), PhaseStatus::Missing);

        let mut lr = classify_log("x.log", Some("successfully completed".to_string()));
        assert_eq!(phase_status(Some(&lr)), PhaseStatus::Pass);

        // A fatal code overrides even a SUCCESS marker.
        lr.ora_counts.insert("ORA-39000".to_string(), 1);
        assert_eq!(phase_status(Some(&lr)), PhaseStatus::Fail);

        let warn = classify_log("y.log", Some("completed with 2 errors".to_string()));
        assert_eq!(phase_status(Some(&warn)), PhaseStatus::Warn);

        let none = classify_log("z.log", Some("still going".to_string()));
        assert_eq!(phase_status(Some(&none)), PhaseStatus::Warn);
    }
}
