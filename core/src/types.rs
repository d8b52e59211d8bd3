//! Type definitions for upgrade-run evidence analysis.
//!
//! This module defines the data model shared by the analyzer and the
//! orchestrating handler. The types are designed for serialization with
//! [`serde`] and make up the wire contract of the sanitized summary
//! document written back to the object store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy;

/// Version of the summary document contract (semver).
///
/// Embedded in every [`Summary`] so downstream consumers can detect
/// incompatible layout changes.
pub const SUMMARY_SCHEMA_VERSION: &str = "1.5.0";

/// Data Pump completion marker extracted from a log.
///
/// Derived by applying completion patterns in strict priority order; only
/// the first matching pattern applies.
///
/// # Examples
///
/// ```
/// use upgrade_audit_core::CompletionState;
///
/// let state = CompletionState::default();
/// assert_eq!(state, CompletionState::None);
/// assert_eq!(state.to_string(), "NONE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionState {
    /// No completion marker found (the default).
    #[default]
    None,
    /// "successfully completed" marker present.
    Success,
    /// Bare "completed" marker without error qualification.
    Completed,
    /// "completed with [N] error(s)" marker present.
    CompletedWithErrors,
}

impl std::fmt::Display for CompletionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::CompletedWithErrors => write!(f, "COMPLETED_WITH_ERRORS"),
        }
    }
}

/// Per-phase Data Pump verdict (export or import).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    /// Log artifact absent.
    Missing,
    /// Completion marker SUCCESS, no fatal codes.
    Pass,
    /// Completed with errors, or evidence inconclusive.
    Warn,
    /// Fatal ORA code present in the log.
    Fail,
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "MISSING"),
            Self::Pass => write!(f, "PASS"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Discrete overall run verdict.
///
/// Independent of the numeric risk score; the two are allowed to disagree
/// (a FAIL can carry a LOW-range score and vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Pass,
    Warn,
    Fail,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Verdict derived from the validation proof artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Pass,
    Warn,
    Fail,
    /// No usable proof evidence at all.
    #[default]
    Unknown,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Risk band derived purely from score thresholds.
///
/// # Examples
///
/// ```
/// use upgrade_audit_core::RiskLevel;
///
/// assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
/// assert_eq!(RiskLevel::from_score(35), RiskLevel::Medium);
/// assert_eq!(RiskLevel::from_score(70), RiskLevel::High);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bands a 0-100 score into a level.
    pub fn from_score(score: u32) -> Self {
        if score >= policy::HIGH_RISK_THRESHOLD {
            Self::High
        } else if score >= policy::MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Analysis of one log artifact.
///
/// Invariant: `found == false` implies an empty `ora_counts` map and
/// completion state [`CompletionState::None`]. Use [`LogResult::missing`]
/// to construct the absent case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogResult {
    /// Key relative to the run prefix.
    pub key_rel: String,
    /// Whether the artifact existed in the store.
    pub found: bool,
    /// Raw (byte-capped) text; never serialized.
    #[serde(skip)]
    pub text: Option<String>,
    /// Upper-cased ORA code to occurrence count.
    pub ora_counts: BTreeMap<String, u32>,
    /// Completion marker classification.
    pub completion_state: CompletionState,
    /// Parsed error count from "completed with N errors", when parsable.
    pub error_count: Option<u32>,
}

impl LogResult {
    /// Constructs the record for an absent artifact.
    pub fn missing(key_rel: &str) -> Self {
        Self {
            key_rel: key_rel.to_string(),
            found: false,
            text: None,
            ora_counts: BTreeMap::new(),
            completion_state: CompletionState::None,
            error_count: None,
        }
    }

    /// True when any fatal ORA code occurs in this log.
    pub fn has_fatal_code(&self) -> bool {
        self.ora_counts.keys().any(|c| policy::is_fatal_code(c))
    }

    /// Fatal codes present in this log, sorted.
    pub fn fatal_codes(&self) -> Vec<String> {
        self.ora_counts
            .keys()
            .filter(|c| policy::is_fatal_code(c))
            .cloned()
            .collect()
    }

    /// Warning-severity codes present in this log, sorted.
    pub fn warn_codes(&self) -> Vec<String> {
        self.ora_counts
            .keys()
            .filter(|c| policy::is_warn_code(c))
            .cloned()
            .collect()
    }
}

/// One import-attempt log discovered under the migration prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCandidate {
    /// Key relative to the run prefix.
    pub key: String,
    /// Filename component of the key.
    pub base_name: String,
    /// Retry number derived from the filename (0 when none encoded).
    pub retry_number: u32,
    /// Object last-modified timestamp from the store listing.
    pub last_modified: DateTime<Utc>,
    /// Object size in bytes, when the listing reported one.
    pub size: Option<u64>,
}

/// Why a particular import attempt was (or was not) selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionReason {
    /// At least one candidate encoded a retry number; highest wins,
    /// last-modified breaks ties.
    #[serde(rename = "filename_retry_number_then_lastmodified")]
    RetryNumberThenLastModified,
    /// No candidate encoded a retry number; latest modification wins.
    #[serde(rename = "lastmodified")]
    LastModified,
    /// Nothing matched the import-log naming convention.
    #[serde(rename = "no_candidates")]
    NoCandidates,
}

impl std::fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RetryNumberThenLastModified => {
                write!(f, "filename_retry_number_then_lastmodified")
            }
            Self::LastModified => write!(f, "lastmodified"),
            Self::NoCandidates => write!(f, "no_candidates"),
        }
    }
}

/// One "created with compilation warnings" finding (ORA-39082).
///
/// Duplicates are preserved: every matching source line yields one finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileWarning {
    /// The ORA code constant ("ORA-39082").
    pub ora: String,
    /// Object type, upper-cased (VIEW, PACKAGE, ...).
    pub object_type: String,
    /// Owning schema, as quoted in the log.
    pub schema: String,
    /// Object name, as quoted in the log.
    pub object_name: String,
}

/// One row sampled from the invalid-object proof table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidObject {
    pub owner: String,
    pub object_name: String,
    pub object_type: String,
    pub status: String,
}

/// Presence flags for the two validation proof artifacts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ValidationEvidence {
    pub invalid_object_proof: bool,
    pub orders_count_proof: bool,
}

/// Verdict derived from the validation proof artifacts.
///
/// The distinction between "no evidence" (`invalid_objects_count: None`)
/// and "zero invalid objects" (`Some(0)`) is load-bearing: zero is only
/// trusted as PASS when the row-count proof corroborates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub invalid_objects_count: Option<u32>,
    /// First 20 invalid rows; the count covers all of them.
    pub invalid_objects_sample: Vec<InvalidObject>,
    pub orders_count: Option<u64>,
    pub evidence: ValidationEvidence,
}

/// The closed set of weighted risk factors.
///
/// Weights are fixed policy constants (see
/// [`RiskFactorKind::weight`]); they are never computed or adapted at
/// runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    MissingRequiredLog,
    MissingImpdpLog,
    ImpdpRetryPresent,
    FatalOraPresent,
    WarnOraPresent,
    DpCompletionMarkerMissing,
    ExpdpCompletedWithErrors,
    ValidationInvalidObjectsPresent,
    ValidationOrdersCountMissing,
}

impl std::fmt::Display for RiskFactorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MissingRequiredLog => "missing_required_log",
            Self::MissingImpdpLog => "missing_impdp_log",
            Self::ImpdpRetryPresent => "impdp_retry_present",
            Self::FatalOraPresent => "fatal_ora_present",
            Self::WarnOraPresent => "warn_ora_present",
            Self::DpCompletionMarkerMissing => "dp_completion_marker_missing",
            Self::ExpdpCompletedWithErrors => "expdp_completed_with_errors",
            Self::ValidationInvalidObjectsPresent => "validation_invalid_objects_present",
            Self::ValidationOrdersCountMissing => "validation_orders_count_missing",
        };
        write!(f, "{name}")
    }
}

/// One triggered risk factor with its weight and supporting evidence.
///
/// Evidence is heterogeneous (a key, a code list, a count, an object) and
/// exists for human audit only; nothing downstream computes over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: RiskFactorKind,
    pub weight: u32,
    pub evidence: serde_json::Value,
}

/// Additive risk model output.
///
/// Invariant: `score` equals the sum of the triggered weights capped at
/// 100, and `factors` preserves evaluation order, not severity order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u32,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
}

/// Export-phase section of the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPhaseReport {
    pub log: Option<String>,
    pub status: PhaseStatus,
    pub completion_state: CompletionState,
    pub completed_with_error_count: Option<u32>,
}

/// Import-phase section of the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPhaseReport {
    pub log: Option<String>,
    pub status: PhaseStatus,
    pub completion_state: CompletionState,
    pub attempt_count: usize,
}

/// Data Pump section of the summary: both phases plus attempt-selection
/// audit data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPumpReport {
    pub export: ExportPhaseReport,
    pub import: ImportPhaseReport,
    pub impdp_candidates: Vec<AttemptCandidate>,
    pub selection_reason: SelectionReason,
}

/// Trigger provenance recorded in the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub bucket: String,
    pub key: String,
}

/// Values derived from the trigger key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedInfo {
    pub run_prefix: String,
    pub selected_impdp_log: Option<String>,
}

/// The aggregate machine-readable output of one analysis invocation.
///
/// Written verbatim to the object store and never read back by the
/// analyzer. Deliberately carries no generated-at timestamp so re-running
/// the pipeline over byte-identical artifacts produces a byte-identical
/// document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub schema_version: String,
    /// Run metadata passed through from the metrics manifest.
    pub run: serde_json::Value,
    pub trigger: TriggerInfo,
    pub derived: DerivedInfo,
    /// Artifact inventory passed through from the metrics manifest.
    pub artifact_inventory: serde_json::Value,
    pub log_presence: BTreeMap<String, bool>,
    pub ora_counts_by_file: BTreeMap<String, BTreeMap<String, u32>>,
    pub datapump: DataPumpReport,
    pub compile_warnings: Vec<CompileWarning>,
    pub validation: ValidationResult,
    pub overall_status: OverallStatus,
    pub status_reasons: Vec<String>,
    pub risk: RiskAssessment,
    /// Bounded excerpts keyed by source artifact then by ORA code.
    pub evidence_excerpts: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub guardrails: Vec<String>,
}

/// Return value of the orchestrating handler, consumed by the external
/// workflow to branch on status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub ok: bool,
    pub bucket: String,
    /// Run prefix with the trailing slash trimmed.
    pub run_prefix: String,
    pub overall_status: OverallStatus,
    pub risk_score: u32,
    pub selected_impdp_log: Option<String>,
    pub sanitized_summary_key: String,
    pub executive_report_key: String,
    /// Which engine produced the report body ("deterministic" or an
    /// engine label).
    pub engine: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_state_display_matches_serde() {
        let states = [
            (CompletionState::None, "NONE"),
            (CompletionState::Success, "SUCCESS"),
            (CompletionState::Completed, "COMPLETED"),
            (CompletionState::CompletedWithErrors, "COMPLETED_WITH_ERRORS"),
        ];
        for (state, expected) in states {
            assert_eq!(state.to_string(), expected);
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{expected}\""));
        }
    }

    #[test]
    fn test_selection_reason_wire_names() {
        let json = serde_json::to_string(&SelectionReason::RetryNumberThenLastModified).unwrap();
        assert_eq!(json, "\"filename_retry_number_then_lastmodified\"");
        let json = serde_json::to_string(&SelectionReason::LastModified).unwrap();
        assert_eq!(json, "\"lastmodified\"");
        let json = serde_json::to_string(&SelectionReason::NoCandidates).unwrap();
        assert_eq!(json, "\"no_candidates\"");
    }

    #[test]
    fn test_risk_factor_kind_display_matches_serde() {
        for kind in [
            RiskFactorKind::MissingRequiredLog,
            RiskFactorKind::MissingImpdpLog,
            RiskFactorKind::ImpdpRetryPresent,
            RiskFactorKind::FatalOraPresent,
            RiskFactorKind::WarnOraPresent,
            RiskFactorKind::DpCompletionMarkerMissing,
            RiskFactorKind::ExpdpCompletedWithErrors,
            RiskFactorKind::ValidationInvalidObjectsPresent,
            RiskFactorKind::ValidationOrdersCountMissing,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_risk_level_bands() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(34), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(35), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(69), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(70), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }

    #[test]
    fn test_missing_log_result_invariant() {
        let lr = LogResult::missing("02-precheck/precheck.log");
        assert!(!lr.found);
        assert!(lr.ora_counts.is_empty());
        assert_eq!(lr.completion_state, CompletionState::None);
        assert_eq!(lr.error_count, None);
    }

    #[test]
    fn test_log_result_text_not_serialized() {
        let mut lr = LogResult::missing("x.log");
        lr.text = Some("secret contents".to_string());
        let json = serde_json::to_string(&lr).unwrap();
        assert!(!json.contains("secret contents"));
    }
}
