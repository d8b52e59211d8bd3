//! Fixed analysis policy: byte caps, artifact allowlist, severity
//! taxonomy, and risk weights.
//!
//! Everything here is a deployment constant. The values are an auditable
//! policy, not tunables: the scorer and classifier must behave identically
//! for identical evidence across invocations and versions.

use crate::types::RiskFactorKind;

/// Byte cap applied when fetching the metrics manifest.
pub const MAX_BYTES_METRICS: usize = 800_000;
/// Byte cap applied when fetching log artifacts.
pub const MAX_BYTES_LOG: usize = 600_000;
/// Byte cap applied when fetching validation proof artifacts.
pub const MAX_BYTES_PROOF: usize = 120_000;

/// Log artifacts analyzed for every run, at fixed relative keys.
pub const ALLOWLIST_RELATIVE_KEYS: [&str; 3] = [
    "02-precheck/precheck.log",
    "03-migration/expdp_legacy_18c.log",
    "04-validation/validation_23c.log",
];

/// Relative prefix listed to discover import-attempt logs.
pub const MIGRATION_PREFIX_REL: &str = "03-migration/";

/// Import-log filename convention: `impdp_*.log`.
pub const IMPORT_LOG_BASENAME_PREFIX: &str = "impdp_";
pub const IMPORT_LOG_BASENAME_SUFFIX: &str = ".log";

/// Filename suffix identifying the export log among the allowlisted keys.
pub const EXPORT_LOG_BASENAME: &str = "expdp_legacy_18c.log";

pub const INVALID_OBJECT_PROOF_REL: &str = "04-validation/invalid_object_proof.txt";
pub const ORDERS_COUNT_PROOF_REL: &str = "04-validation/orders_count_proof.txt";

/// Suffix every metrics trigger key must carry; the run prefix is the
/// part before it.
pub const METRICS_KEY_SUFFIX: &str = "00-metadata/metrics.json";

/// Output key for the machine-readable summary, relative to the run
/// prefix.
pub const SUMMARY_KEY_REL: &str = "00-metadata/sanitized_summary.json";
/// Output key for the executive report, relative to the run prefix.
pub const REPORT_KEY_REL: &str = "05-reports/executive_report.md";

/// ORA codes that make an import attempt unrecoverable.
pub const FATAL_ORA: [&str; 3] = ["ORA-39000", "ORA-31640", "ORA-27037"];

/// ORA codes that degrade confidence without failing the run outright.
pub const WARN_ORA: [&str; 5] = [
    "ORA-31642",
    "ORA-39127",
    "ORA-44002",
    "ORA-06550",
    "ORA-39082",
];

/// ORA codes carried for completeness of the taxonomy; they influence
/// neither the score nor the status.
pub const INFO_ORA: [&str; 1] = ["ORA-06512"];

pub fn is_fatal_code(code: &str) -> bool {
    FATAL_ORA.contains(&code)
}

pub fn is_warn_code(code: &str) -> bool {
    WARN_ORA.contains(&code)
}

pub fn is_info_code(code: &str) -> bool {
    INFO_ORA.contains(&code)
}

/// Score at or above which the risk level is HIGH.
pub const HIGH_RISK_THRESHOLD: u32 = 70;
/// Score at or above which the risk level is MEDIUM.
pub const MEDIUM_RISK_THRESHOLD: u32 = 35;

/// Hard ceiling for the additive risk score.
pub const MAX_RISK_SCORE: u32 = 100;

/// Default symmetric context window around an excerpt hit line.
pub const EXCERPT_CONTEXT_LINES: usize = 2;
/// Global excerpt line budget per source artifact.
pub const EXCERPT_MAX_TOTAL_LINES: usize = 20;

/// Sample caps applied when building the summary.
pub const INVALID_OBJECT_SAMPLE_CAP: usize = 20;

/// Guardrail statements embedded in every summary and report.
pub const GUARDRAILS: [&str; 4] = [
    "No DB connections from AWS.",
    "No execution of SQL/OS commands.",
    "Allowlisted log parsing only.",
    "Bounded reads from S3 objects.",
];

impl RiskFactorKind {
    /// The fixed weight this factor contributes when triggered.
    pub const fn weight(self) -> u32 {
        match self {
            Self::MissingRequiredLog => 15,
            Self::MissingImpdpLog => 25,
            Self::ImpdpRetryPresent => 10,
            Self::FatalOraPresent => 50,
            Self::WarnOraPresent => 15,
            Self::DpCompletionMarkerMissing => 10,
            Self::ExpdpCompletedWithErrors => 10,
            Self::ValidationInvalidObjectsPresent => 25,
            Self::ValidationOrdersCountMissing => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_sets_are_disjoint() {
        for code in FATAL_ORA {
            assert!(!is_warn_code(code));
            assert!(!is_info_code(code));
        }
        for code in WARN_ORA {
            assert!(!is_fatal_code(code));
            assert!(!is_info_code(code));
        }
    }

    #[test]
    fn test_every_factor_has_nonzero_weight() {
        let kinds = [
            RiskFactorKind::MissingRequiredLog,
            RiskFactorKind::MissingImpdpLog,
            RiskFactorKind::ImpdpRetryPresent,
            RiskFactorKind::FatalOraPresent,
            RiskFactorKind::WarnOraPresent,
            RiskFactorKind::DpCompletionMarkerMissing,
            RiskFactorKind::ExpdpCompletedWithErrors,
            RiskFactorKind::ValidationInvalidObjectsPresent,
            RiskFactorKind::ValidationOrdersCountMissing,
        ];
        for kind in kinds {
            assert!(kind.weight() > 0, "{kind} has zero weight");
            assert!(kind.weight() <= MAX_RISK_SCORE);
        }
    }

    #[test]
    fn test_export_log_is_allowlisted() {
        assert!(
            ALLOWLIST_RELATIVE_KEYS
                .iter()
                .any(|k| k.ends_with(EXPORT_LOG_BASENAME))
        );
    }
}
