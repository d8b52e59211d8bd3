//! Deterministic evidence analysis for Oracle upgrade runs.
//!
//! This crate is the analytical core of the pipeline: pure functions that
//! turn raw artifact text into a structured verdict. It performs no I/O;
//! the orchestrating handler fetches every artifact and passes the texts
//! in as an [`EvidenceBundle`].
//!
//! The stages, in data-flow order:
//!
//! - [`extract`] — pattern extractors (ORA codes, completion markers,
//!   retry numbers, compilation warnings, bounded excerpts).
//! - [`classify`] — per-artifact [`LogResult`] derivation.
//! - [`attempt`] — deterministic selection of the authoritative import
//!   attempt among retries.
//! - [`validation`] — proof-artifact parsing and the PASS/WARN/UNKNOWN
//!   verdict.
//! - [`risk`] — the additive 0-100 scoring model.
//! - [`status`] — the PASS/WARN/FAIL short-circuit gate.
//! - [`summary`] — aggregation into the machine-readable [`Summary`].
//! - [`report`] — executive Markdown rendering and the narrative prompt.
//!
//! # Example
//!
//! ```
//! use upgrade_audit_analysis::extract::{completion_state, ora_counts};
//! use upgrade_audit_core::CompletionState;
//!
//! let text = "ORA-39082: warning\nJob \"SYS\".\"IMP\" successfully completed";
//! assert_eq!(ora_counts(text).get("ORA-39082"), Some(&1));
//! assert_eq!(completion_state(text).0, CompletionState::Success);
//! ```
//!
//! [`LogResult`]: upgrade_audit_core::LogResult
//! [`Summary`]: upgrade_audit_core::Summary
//! [`EvidenceBundle`]: summary::EvidenceBundle

pub mod attempt;
pub mod classify;
pub mod extract;
pub mod report;
pub mod risk;
pub mod status;
pub mod summary;
pub mod validation;

pub use attempt::{AttemptSelection, candidate_from_listing, select_final_attempt};
pub use report::{build_narrative_prompt, render_executive_md};
pub use summary::{EvidenceBundle, build_summary};
