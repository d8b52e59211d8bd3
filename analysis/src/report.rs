//! Executive report rendering and narrative prompt composition.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use upgrade_audit_core::Summary;

/// Aggregates per-file ORA counts into a descending top-N list.
pub fn top_ora_codes(
    ora_counts_by_file: &BTreeMap<String, BTreeMap<String, u32>>,
    top_n: usize,
) -> Vec<(String, u32)> {
    let mut agg: BTreeMap<String, u32> = BTreeMap::new();
    for counts in ora_counts_by_file.values() {
        for (code, count) in counts {
            *agg.entry(code.clone()).or_insert(0) += count;
        }
    }
    let mut ranked: Vec<(String, u32)> = agg.into_iter().collect();
    // descending by count; the BTreeMap source keeps equal counts in code
    // order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(top_n);
    ranked
}

/// Renders the executive Markdown report from a summary.
///
/// Section order is fixed. Absent data always renders an explicit
/// placeholder line, never an omitted section.
pub fn render_executive_md(summary: &Summary) -> String {
    let mut out = String::new();
    let run = &summary.run;

    out.push_str("# Oracle Upgrade/Migration Executive Summary\n\n");

    out.push_str("## Run Overview\n");
    let _ = writeln!(out, "- **Run ID:** `{}`", field_str(run, "run_id"));
    let _ = writeln!(out, "- **Run Prefix:** `{}`", summary.derived.run_prefix);
    let _ = writeln!(out, "- **Environment:** `{}`", field_str(run, "environment"));
    let _ = writeln!(out, "- **AWS Region:** `{}`", field_str(run, "aws_region"));
    let _ = writeln!(out, "- **S3 Bucket:** `{}`", summary.trigger.bucket);
    let _ = writeln!(out, "- **Created UTC:** `{}`", field_str(run, "created_utc"));
    let _ = writeln!(out, "- **Overall Status:** `{}`", summary.overall_status);
    out.push('\n');

    out.push_str("## Deterministic Risk Assessment\n");
    let _ = writeln!(out, "- **Risk score (0-100):** {}", summary.risk.score);
    let _ = writeln!(out, "- **Risk level:** `{}`", summary.risk.level);
    if !summary.risk.factors.is_empty() {
        out.push_str("- **Top factors:**\n");
        for factor in summary.risk.factors.iter().take(10) {
            let _ = writeln!(
                out,
                "  - `{}` (+{}): {}",
                factor.factor, factor.weight, factor.evidence
            );
        }
    }
    out.push('\n');

    out.push_str("## Evidence Inventory (S3)\n");
    let _ = writeln!(
        out,
        "- **Object count:** {}",
        field_display(&summary.artifact_inventory, "object_count")
    );
    let _ = writeln!(
        out,
        "- **Total bytes:** {}",
        field_display(&summary.artifact_inventory, "total_bytes")
    );
    let _ = writeln!(
        out,
        "- **Selected IMPDP log (final attempt):** `{}`",
        summary
            .derived
            .selected_impdp_log
            .as_deref()
            .unwrap_or("None")
    );
    let _ = writeln!(
        out,
        "- **Selection reason:** `{}`",
        summary.datapump.selection_reason
    );
    out.push('\n');

    out.push_str("## Data Pump Status (heuristic)\n");
    let export = &summary.datapump.export;
    let _ = writeln!(
        out,
        "- **Export log:** `{}` → `{}` (state={}, errors={})",
        export.log.as_deref().unwrap_or("None"),
        export.status,
        export.completion_state,
        opt_display(export.completed_with_error_count)
    );
    let import = &summary.datapump.import;
    let _ = writeln!(
        out,
        "- **Import log:** `{}` → `{}` (state={}, attempts={})",
        import.log.as_deref().unwrap_or("None"),
        import.status,
        import.completion_state,
        import.attempt_count
    );
    out.push('\n');

    out.push_str("## Validation (from proof artifacts)\n");
    let validation = &summary.validation;
    let _ = writeln!(out, "- **Validation status:** `{}`", validation.status);
    let _ = writeln!(
        out,
        "- **Invalid objects (count):** {}",
        opt_display(validation.invalid_objects_count)
    );
    let _ = writeln!(
        out,
        "- **Orders count proof:** {}",
        opt_display(validation.orders_count)
    );
    if !validation.invalid_objects_sample.is_empty() {
        out.push_str("- **Invalid objects (sample):**\n");
        for obj in validation.invalid_objects_sample.iter().take(10) {
            let _ = writeln!(
                out,
                "  - {}.{} ({}) = {}",
                obj.owner, obj.object_name, obj.object_type, obj.status
            );
        }
    }
    out.push('\n');

    out.push_str("## Key Findings (ORA-* taxonomy)\n");
    let top = top_ora_codes(&summary.ora_counts_by_file, 10);
    if top.is_empty() {
        out.push_str("- No ORA-* patterns detected in parsed logs.\n");
    } else {
        for (code, count) in top {
            let _ = writeln!(out, "- {code}: {count}");
        }
    }
    out.push('\n');

    out.push_str("## Compilation Warnings (ORA-39082)\n");
    if summary.compile_warnings.is_empty() {
        out.push_str("- None detected.\n");
    } else {
        for warning in summary.compile_warnings.iter().take(20) {
            let _ = writeln!(
                out,
                "- {}: {}.{}",
                warning.object_type, warning.schema, warning.object_name
            );
        }
    }
    out.push('\n');

    if !summary.evidence_excerpts.is_empty() {
        out.push_str("## Evidence Excerpts (bounded)\n");
        for (source, by_code) in &summary.evidence_excerpts {
            let _ = writeln!(out, "### {source}");
            for (code, chunk) in by_code {
                let _ = writeln!(out, "- **{code}**");
                out.push_str("```\n");
                for line in chunk {
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("```\n");
            }
        }
        out.push('\n');
    }

    out.push_str("## Governance / Guardrails\n");
    for guardrail in &summary.guardrails {
        let _ = writeln!(out, "- {guardrail}");
    }
    out.push('\n');
    out.push_str("---\n");
    out.push_str("**Note:** Generated from S3 artifacts only. No DB commands executed by AWS components.\n");

    out
}

/// Composes the narrative-engine prompt from the summary evidence.
///
/// The instruction block pins the engine to the supplied evidence: no
/// invented object names, counts, statuses, or execution claims.
pub fn build_narrative_prompt(summary: &Summary) -> String {
    let evidence = serde_json::to_string_pretty(summary)
        .unwrap_or_else(|_| "{}".to_string());

    format!(
        "You are an enterprise Oracle DBA upgrade reviewer.\n\
         Write a report with:\n\
         1) Executive summary\n\
         2) Technical validation summary\n\
         3) Risks/impact\n\
         4) Root cause hypothesis (based ONLY on provided errors/signals)\n\
         5) Remediation + preventive controls\n\n\
         STRICT RULES:\n\
         - Use ONLY the EVIDENCE_JSON below.\n\
         - Do not invent object names, counts, statuses, or execution claims.\n\
         - If missing, write 'Unknown'.\n\
         - Cite the JSON keys you used.\n\n\
         EVIDENCE_JSON:\n{evidence}\n"
    )
}

fn field_str<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn field_display(value: &serde_json::Value, key: &str) -> String {
    match value.get(key) {
        Some(v) if !v.is_null() => v.to_string(),
        _ => "None".to_string(),
    }
}

fn opt_display<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}
