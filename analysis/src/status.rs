//! Overall status classification.
//!
//! A short-circuit decision list evaluated in fixed order, deliberately
//! independent of the numeric risk score: the score is a continuous
//! signal, the status a discrete gate, and the two are allowed to
//! disagree.

use upgrade_audit_core::{
    CompletionState, LogResult, OverallStatus, ValidationResult, ValidationStatus,
};

/// Classifies the run as PASS, WARN, or FAIL with ordered human-readable
/// reasons.
///
/// Decision order:
///
/// 1. Multiple import attempts append a reason (never decide alone).
/// 2. Any fatal ORA code in the selected import log ⇒ FAIL immediately.
/// 3. Validation WARN appends a reason (never decides alone).
/// 4. Import completed with errors ⇒ WARN.
/// 5. Export completed with errors ⇒ WARN.
/// 6. Both phases SUCCESS and validation PASS ⇒ PASS.
/// 7. Anything else ⇒ WARN with a generic not-definitive reason.
pub fn classify(
    expdp: Option<&LogResult>,
    impdp: Option<&LogResult>,
    validation: &ValidationResult,
    attempt_count: usize,
) -> (OverallStatus, Vec<String>) {
    let mut reasons = Vec::new();

    if attempt_count > 1 {
        reasons.push(format!(
            "Multiple impdp attempts detected (count={attempt_count})."
        ));
    }

    let impdp_found = impdp.filter(|lr| lr.found);
    if impdp_found.is_some_and(LogResult::has_fatal_code) {
        reasons.push("Fatal ORA codes detected in impdp.".to_string());
        return (OverallStatus::Fail, reasons);
    }

    if validation.status == ValidationStatus::Warn {
        reasons.push(
            "Post-validation indicates WARN conditions (invalid objects present).".to_string(),
        );
    }

    if impdp_found.is_some_and(|lr| lr.completion_state == CompletionState::CompletedWithErrors) {
        reasons.push("impdp completed with errors.".to_string());
        return (OverallStatus::Warn, reasons);
    }

    let expdp_found = expdp.filter(|lr| lr.found);
    if expdp_found.is_some_and(|lr| lr.completion_state == CompletionState::CompletedWithErrors) {
        reasons.push("expdp completed with errors.".to_string());
        return (OverallStatus::Warn, reasons);
    }

    let both_success = impdp_found
        .is_some_and(|lr| lr.completion_state == CompletionState::Success)
        && expdp_found.is_some_and(|lr| lr.completion_state == CompletionState::Success);
    if both_success && validation.status == ValidationStatus::Pass {
        return (OverallStatus::Pass, reasons);
    }

    reasons.push("Evidence present but not definitive SUCCESS for all phases.".to_string());
    (OverallStatus::Warn, reasons)
}
