//! # Driftcert Certify
//!
//! Stage 7 and the end-to-end pipeline. Classified deltas are reduced to
//! [`RiskCounts`] and policy violations, combined with the caller's
//! [`RunContext`], and turned into a score and a merge decision.
//!
//! ## Architecture
//!
//! ```text
//! Snapshot × Snapshot
//!     │  detect_drift (kernel)
//! Delta*
//!     │  classify, tag, judgments, guardrails (policy)
//! RiskCounts + PolicyViolation*
//!     │  score_run + RunContext
//! ConfidenceScoreResult  ← CRITICAL RULE, then environment thresholds
//!     │
//! EngineOutput           ← deltas, summary, score, digest
//! ```

pub mod context;
pub mod counts;
pub mod engine;
pub mod error;
pub mod scorer;

pub use context::{
    BlastRadiusInfo, ChangeContext, DescriptionQuality, Environment, EvidenceInfo,
    HistoricalContext, ImpactScope, LlmSafetyInput, RunContext,
};
pub use counts::{PolicyViolation, RiskCounts, policy_violations};
pub use engine::{DriftSummary, EngineOutput, run_engine, run_engine_on_dirs};
pub use error::CertifyError;
pub use scorer::{
    ConfidenceLevel, ConfidenceScoreResult, Decision, ScoreRequest, score, score_run,
};
