//! Validation proof parsing and verdict derivation.
//!
//! Two proof artifacts back the post-migration validation: a SQL*Plus
//! style table of invalid objects and a count file containing a single
//! integer line. Both are parsed with allowlisted, format-specific rules;
//! anything unrecognized is ignored rather than guessed at.

use std::sync::LazyLock;

use regex::Regex;

use upgrade_audit_core::{
    InvalidObject, ValidationEvidence, ValidationResult, ValidationStatus, policy,
};

static COLUMN_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("static regex must compile"));

static INTEGER_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{1,12})\s*$").expect("static regex must compile"));

/// Parsed invalid-object table: total INVALID row count plus every row.
#[derive(Debug, Clone, Default)]
pub struct InvalidObjectTable {
    /// `None` when no proof text was supplied at all; `Some(0)` when the
    /// proof exists but lists no invalid rows. The two are not
    /// interchangeable.
    pub count: Option<u32>,
    pub objects: Vec<InvalidObject>,
}

/// Parses the invalid-object proof table.
///
/// Expected shape (SQL*Plus):
///
/// ```text
/// OWNER       OBJECT_NAME   OBJECT_TYPE   STATUS
/// ----------  ------------  ------------  -------
/// LEGACY_APP  BAD_VIEW      VIEW          INVALID
/// ```
///
/// Header rows (first token `OWNER`) and separator rows (dashes/spaces
/// only) are skipped; remaining rows split on runs of two or more spaces
/// and need at least four fields. Rows whose status column is INVALID,
/// case-insensitively, are counted: all of them, not just the sample.
/// Object names containing internal double-space runs mis-split under
/// this rule; that is accepted documented behavior.
pub fn parse_invalid_object_table(text: Option<&str>) -> InvalidObjectTable {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return InvalidObjectTable::default();
    };

    let mut objects = Vec::new();
    let mut count = 0u32;

    for line in text.lines() {
        let s = line.trim();
        if s.is_empty() {
            continue;
        }
        if s.to_ascii_uppercase().starts_with("OWNER") || s.chars().all(|c| c == '-' || c == ' ') {
            continue;
        }

        let parts: Vec<&str> = COLUMN_SPLIT_RE.split(s).collect();
        if parts.len() >= 4 && parts[3].eq_ignore_ascii_case("INVALID") {
            count += 1;
            objects.push(InvalidObject {
                owner: parts[0].to_string(),
                object_name: parts[1].to_string(),
                object_type: parts[2].to_string(),
                status: parts[3].to_string(),
            });
        }
    }

    InvalidObjectTable {
        count: Some(count),
        objects,
    }
}

/// Extracts the row-count value: the first line consisting solely of
/// digits (1-12 of them) with optional surrounding whitespace.
///
/// Absent text or no matching line yields `None`.
pub fn parse_count_proof(text: Option<&str>) -> Option<u64> {
    let text = text?;
    for line in text.lines() {
        if let Some(caps) = INTEGER_LINE_RE.captures(line) {
            return caps[1].parse().ok();
        }
    }
    None
}

/// Derives the validation verdict from both proofs.
///
/// No invalid-object evidence ⇒ UNKNOWN. Any invalid objects ⇒ WARN. Zero
/// invalid objects is trusted as PASS only when the row-count proof
/// corroborates it; without that corroboration it stays WARN.
pub fn derive_validation(
    invalid_proof: Option<&str>,
    count_proof: Option<&str>,
) -> ValidationResult {
    let table = parse_invalid_object_table(invalid_proof);
    let orders_count = parse_count_proof(count_proof);

    let status = match table.count {
        None => ValidationStatus::Unknown,
        Some(n) if n > 0 => ValidationStatus::Warn,
        Some(_) => {
            if orders_count.is_some() {
                ValidationStatus::Pass
            } else {
                ValidationStatus::Warn
            }
        }
    };

    let mut sample = table.objects;
    sample.truncate(policy::INVALID_OBJECT_SAMPLE_CAP);

    ValidationResult {
        status,
        invalid_objects_count: table.count,
        invalid_objects_sample: sample,
        orders_count,
        evidence: ValidationEvidence {
            invalid_object_proof: invalid_proof.is_some(),
            orders_count_proof: count_proof.is_some(),
        },
    }
}
