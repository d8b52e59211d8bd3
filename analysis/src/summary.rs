//! Aggregation of extracted signals into the summary document.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::info;

use upgrade_audit_core::{
    DataPumpReport, DerivedInfo, ExportPhaseReport, ImportPhaseReport, LogResult, Summary,
    TriggerInfo, policy,
};

use crate::attempt::AttemptSelection;
use crate::{classify, extract, risk, status, validation};

/// Everything the summary builder needs, already fetched.
///
/// The builder itself is pure: the orchestrating handler performs every
/// store read, then hands the texts over as plain data.
#[derive(Debug, Clone)]
pub struct EvidenceBundle {
    pub bucket: String,
    pub trigger_key: String,
    /// Run namespace prefix, trailing slash included.
    pub run_prefix: String,
    /// Parsed metrics manifest.
    pub metrics: Value,
    /// Allowlisted log texts in policy order; `None` marks absence.
    pub allowlisted_logs: Vec<(String, Option<String>)>,
    /// Import-attempt selection over the migration-prefix listing.
    pub attempt_selection: AttemptSelection,
    /// Text of the selected import attempt, when one was selected.
    pub selected_attempt_text: Option<String>,
    pub invalid_object_proof: Option<String>,
    pub orders_count_proof: Option<String>,
}

/// Builds the complete [`Summary`] for one run.
///
/// Deterministic: identical bundles produce identical documents.
pub fn build_summary(bundle: EvidenceBundle) -> Summary {
    let mut log_presence = BTreeMap::new();
    let mut ora_counts_by_file = BTreeMap::new();

    let mut required_logs: Vec<LogResult> = Vec::new();
    for (key_rel, text) in bundle.allowlisted_logs {
        let lr = classify::classify_log(&key_rel, text);
        log_presence.insert(key_rel.clone(), lr.found);
        ora_counts_by_file.insert(key_rel, lr.ora_counts.clone());
        required_logs.push(lr);
    }

    let expdp = required_logs
        .iter()
        .find(|lr| lr.key_rel.ends_with(policy::EXPORT_LOG_BASENAME));

    let selection = bundle.attempt_selection;
    let impdp: Option<LogResult> = match (&selection.selected, bundle.selected_attempt_text) {
        (Some(candidate), Some(text)) => Some(classify::classify_log(&candidate.key, Some(text))),
        _ => None,
    };

    let mut evidence_excerpts = BTreeMap::new();
    let mut compile_warnings = Vec::new();
    if let Some(lr) = impdp.as_ref() {
        log_presence.insert(lr.key_rel.clone(), true);
        ora_counts_by_file.insert(lr.key_rel.clone(), lr.ora_counts.clone());

        if let Some(text) = lr.text.as_deref() {
            let fatal_codes = lr.fatal_codes();
            if !fatal_codes.is_empty() {
                evidence_excerpts.insert(
                    lr.key_rel.clone(),
                    extract::excerpts(
                        text,
                        &fatal_codes,
                        policy::EXCERPT_CONTEXT_LINES,
                        policy::EXCERPT_MAX_TOTAL_LINES,
                    ),
                );
            }
            compile_warnings = extract::compile_warnings(text);
        }
    }

    let validation = validation::derive_validation(
        bundle.invalid_object_proof.as_deref(),
        bundle.orders_count_proof.as_deref(),
    );

    let (overall_status, status_reasons) = status::classify(
        expdp,
        impdp.as_ref(),
        &validation,
        selection.attempt_count,
    );
    let risk = risk::assess(
        &required_logs,
        impdp.as_ref(),
        selection.attempt_count,
        expdp,
        &validation,
    );

    info!(
        status = %overall_status,
        score = risk.score,
        attempts = selection.attempt_count,
        "analysis complete"
    );

    let datapump = DataPumpReport {
        export: ExportPhaseReport {
            log: expdp.map(|lr| lr.key_rel.clone()),
            status: classify::phase_status(expdp),
            completion_state: expdp.map(|lr| lr.completion_state).unwrap_or_default(),
            completed_with_error_count: expdp.and_then(|lr| lr.error_count),
        },
        import: ImportPhaseReport {
            log: impdp.as_ref().map(|lr| lr.key_rel.clone()),
            status: classify::phase_status(impdp.as_ref()),
            completion_state: impdp
                .as_ref()
                .map(|lr| lr.completion_state)
                .unwrap_or_default(),
            attempt_count: selection.attempt_count,
        },
        impdp_candidates: selection.candidates,
        selection_reason: selection.reason,
    };

    Summary {
        schema_version: upgrade_audit_core::SUMMARY_SCHEMA_VERSION.to_string(),
        run: bundle
            .metrics
            .get("run")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
        trigger: TriggerInfo {
            bucket: bundle.bucket,
            key: bundle.trigger_key,
        },
        derived: DerivedInfo {
            run_prefix: bundle.run_prefix,
            selected_impdp_log: impdp.as_ref().map(|lr| lr.key_rel.clone()),
        },
        artifact_inventory: bundle
            .metrics
            .get("artifacts_summary")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
        log_presence,
        ora_counts_by_file,
        datapump,
        compile_warnings,
        validation,
        overall_status,
        status_reasons,
        risk,
        evidence_excerpts,
        guardrails: policy::GUARDRAILS.iter().map(|g| (*g).to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::select_final_attempt;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use upgrade_audit_core::{
        AttemptCandidate, OverallStatus, PhaseStatus, RiskFactorKind, SelectionReason,
        ValidationStatus,
    };

    fn candidate(key: &str, retry: u32, hour: u32) -> AttemptCandidate {
        AttemptCandidate {
            key: key.to_string(),
            base_name: key.rsplit('/').next().unwrap().to_string(),
            retry_number: retry,
            last_modified: Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap(),
            size: Some(100),
        }
    }

    fn bundle() -> EvidenceBundle {
        EvidenceBundle {
            bucket: "upgrade-artifacts".to_string(),
            trigger_key: "runs/run-001/00-metadata/metrics.json".to_string(),
            run_prefix: "runs/run-001/".to_string(),
            metrics: json!({
                "run": {"run_id": "run-001", "environment": "lab"},
                "artifacts_summary": {"object_count": 9, "total_bytes": 12345},
            }),
            allowlisted_logs: vec![
                (
                    "02-precheck/precheck.log".to_string(),
                    Some("precheck clean".to_string()),
                ),
                (
                    "03-migration/expdp_legacy_18c.log".to_string(),
                    Some("Job \"SYS\".\"EXP\" completed with 2 errors".to_string()),
                ),
                (
                    "04-validation/validation_23c.log".to_string(),
                    Some("validation pass".to_string()),
                ),
            ],
            attempt_selection: select_final_attempt(vec![candidate(
                "03-migration/impdp_legacy.log",
                0,
                10,
            )]),
            selected_attempt_text: Some("Job \"SYS\".\"IMP\" successfully completed".to_string()),
            invalid_object_proof: Some(
                "OWNER  N  T  S\n----  --  --  --\nLEGACY_APP  BAD_VIEW  VIEW  INVALID\n"
                    .to_string(),
            ),
            orders_count_proof: Some("ORDERS_COUNT\n------------\n50000\n".to_string()),
        }
    }

    #[test]
    fn test_mixed_evidence_scenario() {
        let summary = build_summary(bundle());

        // export errors trigger the WARN gate; validation warns on the
        // invalid object.
        assert_eq!(summary.overall_status, OverallStatus::Warn);
        assert_eq!(summary.validation.status, ValidationStatus::Warn);
        assert!(summary.risk.score > 0);

        let kinds: Vec<_> = summary.risk.factors.iter().map(|f| f.factor).collect();
        assert!(kinds.contains(&RiskFactorKind::ExpdpCompletedWithErrors));
        assert!(kinds.contains(&RiskFactorKind::ValidationInvalidObjectsPresent));

        assert_eq!(summary.datapump.export.status, PhaseStatus::Warn);
        assert_eq!(summary.datapump.import.status, PhaseStatus::Pass);
        assert_eq!(summary.datapump.selection_reason, SelectionReason::LastModified);
        assert_eq!(
            summary.derived.selected_impdp_log.as_deref(),
            Some("03-migration/impdp_legacy.log")
        );
        assert_eq!(summary.run["run_id"], "run-001");
    }

    #[test]
    fn test_summary_is_deterministic() {
        let a = serde_json::to_string(&build_summary(bundle())).unwrap();
        let b = serde_json::to_string(&build_summary(bundle())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fatal_code_captures_excerpts() {
        let mut b = bundle();
        b.selected_attempt_text = Some(
            "line before\nORA-39000: bad dump file specification\nline after\n".to_string(),
        );
        let summary = build_summary(b);

        assert_eq!(summary.overall_status, OverallStatus::Fail);
        let by_code = summary
            .evidence_excerpts
            .get("03-migration/impdp_legacy.log")
            .expect("fatal code should capture an excerpt");
        assert!(by_code.contains_key("ORA-39000"));
        assert_eq!(summary.datapump.import.status, PhaseStatus::Fail);
    }

    #[test]
    fn test_no_selection_marks_import_missing() {
        let mut b = bundle();
        b.attempt_selection = select_final_attempt(Vec::new());
        b.selected_attempt_text = None;
        let summary = build_summary(b);

        assert_eq!(summary.datapump.import.status, PhaseStatus::Missing);
        assert_eq!(summary.derived.selected_impdp_log, None);
        let kinds: Vec<_> = summary.risk.factors.iter().map(|f| f.factor).collect();
        assert!(kinds.contains(&RiskFactorKind::MissingImpdpLog));
        assert_eq!(
            summary.datapump.selection_reason,
            SelectionReason::NoCandidates
        );
    }

    #[test]
    fn test_compile_warnings_from_selected_attempt() {
        let mut b = bundle();
        b.selected_attempt_text = Some(
            r#"ORA-39082: Object type VIEW:"LEGACY_APP"."BAD_VIEW" created with compilation warnings
Job "SYS"."IMP" successfully completed"#
                .to_string(),
        );
        let summary = build_summary(b);
        assert_eq!(summary.compile_warnings.len(), 1);
        assert_eq!(summary.compile_warnings[0].object_name, "BAD_VIEW");
    }
}
