//! Optional narrative report generation.
//!
//! The narrative engine is a black box: prompt in, free text out, may
//! fail. A failure never fails the invocation: the deterministic
//! rendering is substituted with the engine error appended, so the
//! evidence trail survives either way.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use upgrade_audit_analysis::{build_narrative_prompt, render_executive_md};
use upgrade_audit_core::Summary;

/// Default wall-clock budget for one narrative generation.
pub const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 60;

/// Errors from a narrative engine invocation.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("failed to start narrative command: {0}")]
    Spawn(std::io::Error),

    #[error("narrative command I/O failed: {0}")]
    Io(std::io::Error),

    #[error("narrative command timed out after {0}s")]
    Timeout(u64),

    #[error("narrative command exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },
}

/// Text-in, text-out generation boundary.
pub trait NarrativeEngine {
    /// Label recorded in the outcome (e.g. `command:summarizer`).
    fn label(&self) -> String;

    fn generate(&self, prompt: &str) -> Result<String, NarrativeError>;
}

/// Narrative engine backed by a local command: the prompt goes to stdin,
/// the narrative comes back on stdout.
#[derive(Debug)]
pub struct CommandEngine {
    program: String,
    timeout: Duration,
}

impl CommandEngine {
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }
}

impl NarrativeEngine for CommandEngine {
    fn label(&self) -> String {
        let base = self.program.rsplit('/').next().unwrap_or(&self.program);
        format!("command:{base}")
    }

    fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(NarrativeError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .map_err(NarrativeError::Io)?;
        }

        // Drain stdout and stderr in background threads so a full pipe
        // buffer cannot deadlock the child before it exits.
        let stdout_thread = child.stdout.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });
        let stderr_thread = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        match wait_with_timeout(&mut child, self.timeout) {
            Ok(Some(status)) => {
                let stdout = stdout_thread
                    .and_then(|t| t.join().ok())
                    .unwrap_or_default();
                let stderr = stderr_thread
                    .and_then(|t| t.join().ok())
                    .unwrap_or_default();

                if status.success() {
                    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
                } else {
                    Err(NarrativeError::Failed {
                        status: status.code().unwrap_or(-1),
                        stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
                    })
                }
            }
            Ok(None) => {
                debug!(program = %self.program, "narrative command timed out, killing");
                let _ = child.kill();
                let _ = child.wait();
                Err(NarrativeError::Timeout(self.timeout.as_secs()))
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(NarrativeError::Io(e))
            }
        }
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

fn report_header(summary: &Summary, engine_label: &str) -> String {
    let run_id = summary
        .run
        .get("run_id")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    format!(
        "# Oracle Upgrade / Migration Executive Report\n\
         **Run ID:** {run_id}\n\
         **Generated (UTC):** {}\n\
         **Engine:** {engine_label}\n\n---\n",
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    )
}

/// Produces the report body and the engine label that produced it.
///
/// Without an engine the deterministic rendering is the report. With one,
/// a successful non-empty generation is used under a provenance header;
/// any failure or empty output substitutes the deterministic rendering
/// with the failure reason appended, never silently discarded.
pub fn compose_report(summary: &Summary, engine: Option<&dyn NarrativeEngine>) -> (String, String) {
    let deterministic = render_executive_md(summary);
    let Some(engine) = engine else {
        return (deterministic, "deterministic".to_string());
    };

    let prompt = build_narrative_prompt(summary);
    match engine.generate(&prompt) {
        Ok(body) if !body.is_empty() => {
            let label = engine.label();
            let report = format!("{}{body}\n", report_header(summary, &label));
            (report, label)
        }
        Ok(_) => (
            format!("{deterministic}\n---\n**Narrative engine error:** empty output\n"),
            "deterministic".to_string(),
        ),
        Err(e) => (
            format!("{deterministic}\n---\n**Narrative engine error:** {e}\n"),
            "deterministic".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use upgrade_audit_analysis::{EvidenceBundle, build_summary, select_final_attempt};

    struct FailingEngine;

    impl NarrativeEngine for FailingEngine {
        fn label(&self) -> String {
            "command:broken".to_string()
        }

        fn generate(&self, _prompt: &str) -> Result<String, NarrativeError> {
            Err(NarrativeError::Timeout(5))
        }
    }

    struct EchoEngine;

    impl NarrativeEngine for EchoEngine {
        fn label(&self) -> String {
            "command:echo".to_string()
        }

        fn generate(&self, _prompt: &str) -> Result<String, NarrativeError> {
            Ok("Narrative body.".to_string())
        }
    }

    fn summary() -> Summary {
        build_summary(EvidenceBundle {
            bucket: "b".to_string(),
            trigger_key: "runs/r1/00-metadata/metrics.json".to_string(),
            run_prefix: "runs/r1/".to_string(),
            metrics: json!({"run": {"run_id": "r1"}}),
            allowlisted_logs: Vec::new(),
            attempt_selection: select_final_attempt(Vec::new()),
            selected_attempt_text: None,
            invalid_object_proof: None,
            orders_count_proof: None,
        })
    }

    #[test]
    fn test_no_engine_uses_deterministic_rendering() {
        let (report, label) = compose_report(&summary(), None);
        assert_eq!(label, "deterministic");
        assert!(report.starts_with("# Oracle Upgrade/Migration Executive Summary"));
    }

    #[test]
    fn test_engine_failure_substitutes_with_reason() {
        let (report, label) = compose_report(&summary(), Some(&FailingEngine));
        assert_eq!(label, "deterministic");
        assert!(report.contains("## Governance / Guardrails"));
        assert!(report.contains("**Narrative engine error:** narrative command timed out after 5s"));
    }

    #[test]
    fn test_engine_success_gets_provenance_header() {
        let (report, label) = compose_report(&summary(), Some(&EchoEngine));
        assert_eq!(label, "command:echo");
        assert!(report.contains("**Run ID:** r1"));
        assert!(report.contains("**Engine:** command:echo"));
        assert!(report.ends_with("Narrative body.\n"));
    }

    #[test]
    fn test_command_engine_label_strips_path() {
        let engine = CommandEngine::new("/usr/local/bin/summarize", Duration::from_secs(5));
        assert_eq!(engine.label(), "command:summarize");
    }
}
