//! Core types and fixed policy for Oracle upgrade evidence audits.
//!
//! This crate defines the foundational data model shared by the analyzer
//! and the orchestrating handler:
//!
//! - [`LogResult`] — per-artifact extraction outcome (ORA counts,
//!   completion state, error count).
//! - [`AttemptCandidate`] / [`SelectionReason`] — import-attempt selection
//!   inputs and audit trail.
//! - [`ValidationResult`] — verdict from the proof artifacts.
//! - [`RiskAssessment`] / [`RiskFactor`] — the additive 0-100 risk model.
//! - [`Summary`] — the aggregate machine-readable document written back to
//!   the object store.
//!
//! The [`policy`] module holds the fixed, auditable analysis policy:
//! severity taxonomy, risk weights, byte caps, and the well-known
//! artifact keys of a run.
//!
//! # Example
//!
//! ```
//! use upgrade_audit_core::{LogResult, RiskFactorKind, RiskLevel, policy};
//!
//! let missing = LogResult::missing("02-precheck/precheck.log");
//! assert!(!missing.found);
//!
//! // Weights are policy constants, not tunables.
//! assert_eq!(RiskFactorKind::FatalOraPresent.weight(), 50);
//! assert_eq!(RiskLevel::from_score(50), RiskLevel::Medium);
//! assert!(policy::is_fatal_code("ORA-39000"));
//! ```

pub mod policy;
mod types;

pub use types::*;
