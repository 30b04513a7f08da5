//! # Driftcert Policy
//!
//! Stages 5 and 6: every delta gets a baseline risk from a fixed rule
//! order, then a policy tag from the allow-list and invariants. External
//! judgments and guardrail flags may raise risk afterwards, never lower it.
//!
//! ## Architecture
//!
//! ```text
//! Delta (from the kernel)
//!     │
//! classify              ← first-match rule order → (risk_level, reason)
//!     │
//! tag                   ← env_allow_keys, then invariants → policy_tag
//!     │
//! apply_judgment        ← contextual re-categorization (upgrade-or-keep)
//! apply_guardrail_flags ← secret / malicious flags (upgrade-or-keep)
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod judgment;
pub mod tag;

pub use classify::{RiskRule, classify, classify_all, match_rule};
pub use config::{Invariant, LoadedPolicy, PolicyConfig};
pub use error::{InvariantConfigError, PolicyError};
pub use judgment::{
    ContextualJudgment, GuardrailFlags, JudgmentCategory, apply_guardrail_flags, apply_guardrails,
    apply_judgment, apply_judgments,
};
pub use tag::{ALLOW_RULE, evaluate, tag, tag_all};
