//! Orchestrating handler: trigger parsing, artifact fetch, analysis,
//! output writes.
//!
//! The handler is the only place collaborators live. The store and the
//! optional narrative engine are injected per invocation; everything
//! between fetch and write is a pure call into the analysis crate.

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use upgrade_audit_analysis::{EvidenceBundle, build_summary, candidate_from_listing, select_final_attempt};
use upgrade_audit_core::{AnalysisOutcome, policy};
use upgrade_audit_store::{ObjectStore, StoreError, keys, put_json};

use crate::narrative::{NarrativeEngine, compose_report};

/// Errors that abort an invocation before outputs are written.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The trigger JSON matched no recognized shape.
    #[error(
        "unsupported event shape: expected a storage notification, {{\"bucket\",\"key\"}}, or {{\"run_id\"}}"
    )]
    UnsupportedEvent,

    /// The metrics manifest is required; without it there is no run.
    #[error("metrics manifest not found at {key}")]
    MetricsMissing { key: String },

    /// The metrics manifest exists but is not valid JSON.
    #[error("metrics manifest at {key} is not valid JSON: {source}")]
    MetricsInvalid {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Store fault other than evidence absence.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The recognized invocation shapes, validated once at the boundary.
///
/// Everything downstream consumes the resolved metrics key; no raw event
/// dictionary travels past this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Storage object-created notification for the metrics manifest.
    Notification { bucket: String, key: String },
    /// Direct invocation naming the manifest key.
    Manual { bucket: Option<String>, key: String },
    /// Direct invocation naming only the run id.
    Run { run_id: String },
}

impl TriggerEvent {
    /// Parses a raw event document into one of the recognized shapes.
    pub fn from_json(event: &Value) -> Result<Self, HandlerError> {
        if let Some(records) = event.get("Records").and_then(Value::as_array)
            && let Some(first) = records.first()
        {
            let bucket = first
                .pointer("/s3/bucket/name")
                .and_then(Value::as_str);
            let key = first.pointer("/s3/object/key").and_then(Value::as_str);
            if let (Some(bucket), Some(key)) = (bucket, key) {
                return Ok(Self::Notification {
                    bucket: bucket.to_string(),
                    key: decode_notification_key(key),
                });
            }
            return Err(HandlerError::UnsupportedEvent);
        }

        if let Some(key) = event.get("key").and_then(Value::as_str) {
            return Ok(Self::Manual {
                bucket: event
                    .get("bucket")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                key: key.to_string(),
            });
        }

        if let Some(run_id) = event.get("run_id").and_then(Value::as_str) {
            return Ok(Self::Run {
                run_id: run_id.to_string(),
            });
        }

        Err(HandlerError::UnsupportedEvent)
    }

    /// The metrics key this event points at.
    pub fn metrics_key(&self) -> String {
        match self {
            Self::Notification { key, .. } | Self::Manual { key, .. } => key.clone(),
            Self::Run { run_id } => keys::metrics_key_for_run(run_id),
        }
    }

    fn bucket(&self) -> Option<&str> {
        match self {
            Self::Notification { bucket, .. } => Some(bucket),
            Self::Manual { bucket, .. } => bucket.as_deref(),
            Self::Run { .. } => None,
        }
    }
}

/// Notification keys arrive URL-encoded ('+' for space, %XX escapes).
fn decode_notification_key(raw: &str) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' => match (hex_val(bytes.get(i + 1)), hex_val(bytes.get(i + 2))) {
                (Some(hi), Some(lo)) => {
                    out.push(hi * 16 + lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(byte: Option<&u8>) -> Option<u8> {
    (*byte? as char).to_digit(16).map(|d| d as u8)
}

/// Runs one complete analysis: fetch, analyze, write, report.
///
/// Re-invocation on the same run overwrites its own prior outputs; given
/// byte-identical artifacts, the written summary is byte-identical too.
pub fn run_analysis(
    store: &dyn ObjectStore,
    event: &TriggerEvent,
    engine: Option<&dyn NarrativeEngine>,
) -> Result<AnalysisOutcome, HandlerError> {
    let metrics_key = event.metrics_key();
    let bucket = event.bucket().unwrap_or_else(|| store.name()).to_string();
    let run_prefix = keys::derive_run_prefix(&metrics_key)?;
    info!(bucket = %bucket, key = %metrics_key, run_prefix = %run_prefix, "starting analysis");

    let metrics_text = store
        .get_text(&metrics_key, policy::MAX_BYTES_METRICS)
        .map_err(|e| match e {
            StoreError::NotFound { key } => HandlerError::MetricsMissing { key },
            other => HandlerError::Store(other),
        })?;
    let metrics: Value =
        serde_json::from_str(&metrics_text).map_err(|source| HandlerError::MetricsInvalid {
            key: metrics_key.clone(),
            source,
        })?;

    let mut allowlisted_logs = Vec::new();
    for rel in policy::ALLOWLIST_RELATIVE_KEYS {
        let text = store.try_get_text(&format!("{run_prefix}{rel}"), policy::MAX_BYTES_LOG)?;
        allowlisted_logs.push((rel.to_string(), text));
    }

    let listing = store.list(&format!("{run_prefix}{}", policy::MIGRATION_PREFIX_REL))?;
    let candidates = listing
        .into_iter()
        .filter_map(|obj| {
            let rel = keys::strip_run_prefix(&obj.key, &run_prefix).to_string();
            candidate_from_listing(&rel, obj.last_modified, Some(obj.size))
        })
        .collect();
    let attempt_selection = select_final_attempt(candidates);

    let selected_attempt_text = match attempt_selection.selected.as_ref() {
        Some(candidate) => Some(store.get_text(
            &format!("{run_prefix}{}", candidate.key),
            policy::MAX_BYTES_LOG,
        )?),
        None => None,
    };

    let invalid_object_proof = store.try_get_text(
        &format!("{run_prefix}{}", policy::INVALID_OBJECT_PROOF_REL),
        policy::MAX_BYTES_PROOF,
    )?;
    let orders_count_proof = store.try_get_text(
        &format!("{run_prefix}{}", policy::ORDERS_COUNT_PROOF_REL),
        policy::MAX_BYTES_PROOF,
    )?;

    let summary = build_summary(EvidenceBundle {
        bucket: bucket.clone(),
        trigger_key: metrics_key,
        run_prefix: run_prefix.clone(),
        metrics,
        allowlisted_logs,
        attempt_selection,
        selected_attempt_text,
        invalid_object_proof,
        orders_count_proof,
    });

    let summary_key = format!("{run_prefix}{}", policy::SUMMARY_KEY_REL);
    put_json(store, &summary_key, &summary)?;

    let (report, engine_label) = compose_report(&summary, engine);
    let report_key = format!("{run_prefix}{}", policy::REPORT_KEY_REL);
    store.put_text(&report_key, &report)?;

    info!(
        status = %summary.overall_status,
        score = summary.risk.score,
        summary_key = %summary_key,
        report_key = %report_key,
        "analysis outputs written"
    );

    Ok(AnalysisOutcome {
        ok: true,
        bucket,
        run_prefix: run_prefix.trim_end_matches('/').to_string(),
        overall_status: summary.overall_status,
        risk_score: summary.risk.score,
        selected_impdp_log: summary.derived.selected_impdp_log.clone(),
        sanitized_summary_key: summary_key,
        executive_report_key: report_key,
        engine: engine_label,
    })
}
