//! Pattern-based extractors over raw log text.
//!
//! Every function here is pure: text in, structured findings out. The
//! patterns are fixed extraction rules applied in explicit priority order;
//! callers never see a partially-applied cascade.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use upgrade_audit_core::{CompileWarning, CompletionState};

/// Regex patterns for log extraction.
static PATTERNS: LazyLock<LogPatterns> = LazyLock::new(LogPatterns::new);

struct LogPatterns {
    // ORA-12345 style error codes
    ora_code: Regex,

    // Data Pump completion markers, in priority order
    dp_success: Regex,
    dp_completed_with_n_errors: Regex,
    dp_completed_with_errors: Regex,
    dp_completed: Regex,

    // retry suffix in import-log filenames: retry, retry2, ...
    retry_token: Regex,

    // ORA-39082: Object type VIEW:"OWNER"."NAME" created with compilation warnings
    compile_warning: Regex,
}

impl LogPatterns {
    fn new() -> Self {
        Self {
            ora_code: Regex::new(r"(?i)\b(ORA-\d{5})\b").expect("static regex must compile"),
            dp_success: Regex::new(r"(?i)\bsuccessfully completed\b")
                .expect("static regex must compile"),
            dp_completed_with_n_errors: Regex::new(r"(?i)\bcompleted with\s+(\d+)\s+error")
                .expect("static regex must compile"),
            dp_completed_with_errors: Regex::new(r"(?i)\bcompleted with\s+error")
                .expect("static regex must compile"),
            dp_completed: Regex::new(r"(?i)\bcompleted\b").expect("static regex must compile"),
            retry_token: Regex::new(r"(?i)retry(\d+)?").expect("static regex must compile"),
            compile_warning: Regex::new(
                r#"(?i)ORA-39082:\s+Object type\s+(\w+):"([^"]+)"\."([^"]+)"\s+created with compilation warnings"#,
            )
            .expect("static regex must compile"),
        }
    }
}

/// Counts ORA-* codes in the text, keyed by upper-cased code.
///
/// Order-independent; repeated codes accumulate.
///
/// # Examples
///
/// ```
/// use upgrade_audit_analysis::extract::ora_counts;
///
/// let counts = ora_counts("ora-39082 then ORA-39082 then ORA-06512");
/// assert_eq!(counts.get("ORA-39082"), Some(&2));
/// assert_eq!(counts.get("ORA-06512"), Some(&1));
/// ```
pub fn ora_counts(text: &str) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for caps in PATTERNS.ora_code.captures_iter(text) {
        let code = caps[1].to_ascii_uppercase();
        *counts.entry(code).or_insert(0) += 1;
    }
    counts
}

/// Classifies the Data Pump completion marker of a log.
///
/// Patterns apply in strict priority order; only the first match counts:
///
/// 1. "successfully completed" ⇒ SUCCESS with 0 errors
/// 2. "completed with N error(s)" ⇒ COMPLETED_WITH_ERRORS with N
///    (an unparsable N keeps the state and drops the count)
/// 3. "completed with error(s)" ⇒ COMPLETED_WITH_ERRORS, count unknown
/// 4. bare "completed" ⇒ COMPLETED
/// 5. otherwise NONE
pub fn completion_state(text: &str) -> (CompletionState, Option<u32>) {
    if PATTERNS.dp_success.is_match(text) {
        return (CompletionState::Success, Some(0));
    }

    if let Some(caps) = PATTERNS.dp_completed_with_n_errors.captures(text) {
        return (CompletionState::CompletedWithErrors, caps[1].parse().ok());
    }

    if PATTERNS.dp_completed_with_errors.is_match(text) {
        return (CompletionState::CompletedWithErrors, None);
    }

    if PATTERNS.dp_completed.is_match(text) {
        return (CompletionState::Completed, None);
    }

    (CompletionState::None, None)
}

/// Derives the retry number encoded in an import-log filename.
///
/// No "retry" token ⇒ 0; a bare token ⇒ 1; a numbered token ⇒ that
/// number. Digits that do not fit fail soft to 1.
///
/// # Examples
///
/// ```
/// use upgrade_audit_analysis::extract::retry_number;
///
/// assert_eq!(retry_number("impdp_legacy.log"), 0);
/// assert_eq!(retry_number("impdp_legacy_retry.log"), 1);
/// assert_eq!(retry_number("impdp_legacy_RETRY3.log"), 3);
/// ```
pub fn retry_number(filename: &str) -> u32 {
    let Some(caps) = PATTERNS.retry_token.captures(filename) else {
        return 0;
    };
    match caps.get(1) {
        None => 1,
        Some(digits) => digits.as_str().parse().unwrap_or(1),
    }
}

/// Extracts ORA-39082 compilation-warning findings.
///
/// One finding per matching line; duplicates are preserved so the report
/// reflects every occurrence.
pub fn compile_warnings(text: &str) -> Vec<CompileWarning> {
    PATTERNS
        .compile_warning
        .captures_iter(text)
        .map(|caps| CompileWarning {
            ora: "ORA-39082".to_string(),
            object_type: caps[1].to_ascii_uppercase(),
            schema: caps[2].to_string(),
            object_name: caps[3].to_string(),
        })
        .collect()
}

/// Collects bounded context excerpts around the first occurrence of each
/// code.
///
/// For each code (in the given order) the first line containing it,
/// case-insensitively, anchors a symmetric window of `context_lines`.
/// Chunks accumulate until `max_total_lines` is spent; later codes are
/// silently skipped once the budget is exhausted. Codes absent from the
/// text are skipped without error.
pub fn excerpts(
    text: &str,
    codes: &[String],
    context_lines: usize,
    max_total_lines: usize,
) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    if text.is_empty() || codes.is_empty() {
        return out;
    }

    let lines: Vec<&str> = text.lines().collect();
    let mut used = 0usize;

    for code in codes {
        let code_upper = code.to_ascii_uppercase();
        let Some(hit_idx) = lines
            .iter()
            .position(|ln| ln.to_ascii_uppercase().contains(&code_upper))
        else {
            continue;
        };

        let start = hit_idx.saturating_sub(context_lines);
        let end = (hit_idx + context_lines + 1).min(lines.len());
        let mut chunk: Vec<String> = lines[start..end].iter().map(|s| (*s).to_string()).collect();

        let remaining = max_total_lines.saturating_sub(used);
        if remaining == 0 {
            break;
        }
        chunk.truncate(remaining);

        used += chunk.len();
        out.insert(code_upper, chunk);
    }

    out
}
