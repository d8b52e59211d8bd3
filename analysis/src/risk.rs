//! Additive risk scoring over extracted signals.

use serde_json::json;

use upgrade_audit_core::{
    LogResult, RiskAssessment, RiskFactor, RiskFactorKind, RiskLevel, ValidationResult, policy,
};

fn triggered(kind: RiskFactorKind, evidence: serde_json::Value) -> RiskFactor {
    RiskFactor {
        factor: kind,
        weight: kind.weight(),
        evidence,
    }
}

/// Computes the deterministic risk assessment.
///
/// Factors are evaluated in a fixed order and each triggered factor adds
/// its fixed weight; the sum is capped at 100. Fatal and warning ORA
/// factors are mutually exclusive (fatal wins), and the missing
/// completion-marker factor only fires when no fatal code already accounts
/// for the same failure.
pub fn assess(
    required_logs: &[LogResult],
    impdp: Option<&LogResult>,
    attempt_count: usize,
    expdp: Option<&LogResult>,
    validation: &ValidationResult,
) -> RiskAssessment {
    let mut score = 0u32;
    let mut factors = Vec::new();

    for lr in required_logs {
        if !lr.found {
            factors.push(triggered(
                RiskFactorKind::MissingRequiredLog,
                json!(lr.key_rel),
            ));
        }
    }

    let impdp_found = impdp.is_some_and(|lr| lr.found);
    if !impdp_found {
        factors.push(triggered(
            RiskFactorKind::MissingImpdpLog,
            json!("No impdp log selected/found under 03-migration/"),
        ));
    }

    if attempt_count > 1 {
        factors.push(triggered(
            RiskFactorKind::ImpdpRetryPresent,
            json!(format!("impdp_log_count={attempt_count}")),
        ));
    }

    let fatal_codes = impdp.filter(|lr| lr.found).map_or_else(Vec::new, |lr| lr.fatal_codes());
    let warn_codes = impdp.filter(|lr| lr.found).map_or_else(Vec::new, |lr| lr.warn_codes());

    let fatal_present = !fatal_codes.is_empty();
    if fatal_present {
        factors.push(triggered(RiskFactorKind::FatalOraPresent, json!(fatal_codes)));
    } else if !warn_codes.is_empty() {
        factors.push(triggered(RiskFactorKind::WarnOraPresent, json!(warn_codes)));
    }

    // A missing completion marker only counts when no fatal code already
    // explains the failure.
    if let Some(lr) = impdp.filter(|lr| lr.found)
        && lr.completion_state == upgrade_audit_core::CompletionState::None
        && !fatal_present
    {
        factors.push(triggered(
            RiskFactorKind::DpCompletionMarkerMissing,
            json!(lr.key_rel),
        ));
    }

    if let Some(lr) = expdp.filter(|lr| lr.found)
        && lr.completion_state == upgrade_audit_core::CompletionState::CompletedWithErrors
    {
        factors.push(triggered(
            RiskFactorKind::ExpdpCompletedWithErrors,
            json!({ "log": lr.key_rel, "error_count": lr.error_count }),
        ));
    }

    if let Some(count) = validation.invalid_objects_count
        && count > 0
    {
        factors.push(triggered(
            RiskFactorKind::ValidationInvalidObjectsPresent,
            json!(count),
        ));
    }

    if validation.orders_count.is_none() {
        factors.push(triggered(
            RiskFactorKind::ValidationOrdersCountMissing,
            json!("orders_count_proof missing or unparseable"),
        ));
    }

    for factor in &factors {
        score += factor.weight;
    }
    score = score.min(policy::MAX_RISK_SCORE);

    RiskAssessment {
        score,
        level: RiskLevel::from_score(score),
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upgrade_audit_core::{CompletionState, ValidationEvidence, ValidationStatus};

    fn found_log(key: &str, state: CompletionState) -> LogResult {
        LogResult {
            key_rel: key.to_string(),
            found: true,
            text: None,
            ora_counts: std::collections::BTreeMap::new(),
            completion_state: state,
            error_count: None,
        }
    }

    fn clean_validation() -> ValidationResult {
        ValidationResult {
            status: ValidationStatus::Pass,
            invalid_objects_count: Some(0),
            invalid_objects_sample: Vec::new(),
            orders_count: Some(50_000),
            evidence: ValidationEvidence {
                invalid_object_proof: true,
                orders_count_proof: true,
            },
        }
    }

    #[test]
    fn test_clean_run_scores_zero() {
        let required = vec![
            found_log("02-precheck/precheck.log", CompletionState::None),
            found_log("03-migration/expdp_legacy_18c.log", CompletionState::Success),
            found_log("04-validation/validation_23c.log", CompletionState::None),
        ];
        let impdp = found_log("03-migration/impdp_legacy.log", CompletionState::Success);
        let assessment = assess(&required, Some(&impdp), 1, Some(&required[1]), &clean_validation());
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.factors.is_empty());
    }

    #[test]
    fn test_missing_logs_accumulate_per_artifact() {
        let required = vec![
            LogResult::missing("02-precheck/precheck.log"),
            LogResult::missing("03-migration/expdp_legacy_18c.log"),
        ];
        let assessment = assess(&required, None, 0, None, &clean_validation());
        // 15 + 15 missing required + 25 missing impdp
        assert_eq!(assessment.score, 55);
        assert_eq!(assessment.factors.len(), 3);
        assert_eq!(
            assessment.factors[0].factor,
            RiskFactorKind::MissingRequiredLog
        );
        assert_eq!(assessment.factors[2].factor, RiskFactorKind::MissingImpdpLog);
    }

    #[test]
    fn test_fatal_suppresses_warn_and_marker_factor() {
        let mut impdp = found_log("03-migration/impdp_legacy.log", CompletionState::None);
        impdp.ora_counts.insert("ORA-39000".to_string(), 1);
        impdp.ora_counts.insert("ORA-39082".to_string(), 3);

        let required = vec![found_log(
            "03-migration/expdp_legacy_18c.log",
            CompletionState::Success,
        )];
        let assessment = assess(&required, Some(&impdp), 1, Some(&required[0]), &clean_validation());

        let kinds: Vec<_> = assessment.factors.iter().map(|f| f.factor).collect();
        assert!(kinds.contains(&RiskFactorKind::FatalOraPresent));
        assert!(!kinds.contains(&RiskFactorKind::WarnOraPresent));
        assert!(!kinds.contains(&RiskFactorKind::DpCompletionMarkerMissing));
        assert_eq!(assessment.score, 50);
    }

    #[test]
    fn test_warn_codes_fire_without_fatal() {
        let mut impdp = found_log("03-migration/impdp_legacy.log", CompletionState::Success);
        impdp.ora_counts.insert("ORA-39082".to_string(), 2);

        let assessment = assess(&[], Some(&impdp), 1, None, &clean_validation());
        let kinds: Vec<_> = assessment.factors.iter().map(|f| f.factor).collect();
        assert!(kinds.contains(&RiskFactorKind::WarnOraPresent));
        assert_eq!(assessment.score, RiskFactorKind::WarnOraPresent.weight());
    }

    #[test]
    fn test_score_is_clamped_at_100() {
        let required = vec![
            LogResult::missing("02-precheck/precheck.log"),
            LogResult::missing("03-migration/expdp_legacy_18c.log"),
            LogResult::missing("04-validation/validation_23c.log"),
        ];
        let validation = ValidationResult {
            status: ValidationStatus::Warn,
            invalid_objects_count: Some(5),
            invalid_objects_sample: Vec::new(),
            orders_count: None,
            evidence: ValidationEvidence::default(),
        };
        // 3*15 + 25 + 10 + 25 + 5 = 110 before clamping
        let assessment = assess(&required, None, 2, None, &validation);
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.level, RiskLevel::High);
    }

    #[test]
    fn test_monotone_in_triggered_factors() {
        let base = assess(&[], None, 0, None, &clean_validation());
        let validation_missing_count = ValidationResult {
            orders_count: None,
            ..clean_validation()
        };
        let more = assess(&[], None, 0, None, &validation_missing_count);
        assert!(more.score >= base.score);
    }

    #[test]
    fn test_expdp_errors_factor_carries_log_evidence() {
        let mut expdp = found_log(
            "03-migration/expdp_legacy_18c.log",
            CompletionState::CompletedWithErrors,
        );
        expdp.error_count = Some(2);
        let impdp = found_log("03-migration/impdp_legacy.log", CompletionState::Success);

        let assessment = assess(&[], Some(&impdp), 1, Some(&expdp), &clean_validation());
        let factor = assessment
            .factors
            .iter()
            .find(|f| f.factor == RiskFactorKind::ExpdpCompletedWithErrors)
            .expect("factor should trigger");
        assert_eq!(factor.evidence["error_count"], 2);
        assert_eq!(factor.evidence["log"], "03-migration/expdp_legacy_18c.log");
    }
}
