//! External judgments applied on top of the baseline risk.
//!
//! Two sources can raise a delta's risk after classification: a contextual
//! judgment (re-categorization plus explanation) and guardrail flags from
//! secret and malicious-pattern scanning. Both are upgrade-or-keep; nothing
//! here ever lowers a risk level or touches a policy tag.

use driftcert_kernel::{Delta, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentCategory {
    High,
    Medium,
    Low,
    AllowedVariance,
}

impl JudgmentCategory {
    /// The risk level this category asks for. `AllowedVariance` asks for
    /// none.
    pub fn risk_level(&self) -> Option<RiskLevel> {
        match self {
            JudgmentCategory::High => Some(RiskLevel::High),
            JudgmentCategory::Medium => Some(RiskLevel::Medium),
            JudgmentCategory::Low => Some(RiskLevel::Low),
            JudgmentCategory::AllowedVariance => None,
        }
    }
}

impl std::str::FromStr for JudgmentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" | "med" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "allowed_variance" | "allowed-variance" | "allowed" => Ok(Self::AllowedVariance),
            _ => Err(format!("unknown judgment category: {s}")),
        }
    }
}

/// A contextual re-categorization of one delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextualJudgment {
    #[serde(default)]
    pub category: Option<JudgmentCategory>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_probability: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,
}

/// Scanner results for one delta's sanitized values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailFlags {
    #[serde(default)]
    pub secret_detected: bool,
    #[serde(default)]
    pub malicious_severity: Option<RiskLevel>,
}

/// Returns true if the risk level changed.
pub fn apply_judgment(delta: &mut Delta, judgment: &ContextualJudgment) -> bool {
    let Some(level) = judgment.category.and_then(|c| c.risk_level()) else {
        return false;
    };
    let explanation = judgment.explanation.trim();
    let reason = if explanation.is_empty() {
        "contextual judgment"
    } else {
        explanation
    };
    if delta.upgrade_risk(level, reason) {
        return true;
    }
    if !explanation.is_empty() {
        delta.risk_reason = format!("{} Context: {explanation}", delta.risk_reason);
    }
    false
}

/// Returns true if the risk level changed.
pub fn apply_guardrail_flags(delta: &mut Delta, flags: &GuardrailFlags) -> bool {
    let mut changed = false;
    if flags.secret_detected {
        changed |= delta.upgrade_risk(RiskLevel::High, "secret detected in changed value");
    }
    if let Some(severity) = flags.malicious_severity {
        changed |= delta.upgrade_risk(severity, "malicious pattern detected");
    }
    changed
}

/// Apply judgments keyed by delta id. Unknown ids are ignored.
pub fn apply_judgments(deltas: &mut [Delta], judgments: &BTreeMap<String, ContextualJudgment>) {
    for delta in deltas.iter_mut() {
        if let Some(judgment) = judgments.get(&delta.id) {
            if apply_judgment(delta, judgment) {
                tracing::debug!(delta = %delta.id, level = %delta.risk_level, "judgment upgraded risk");
            }
        }
    }
}

/// Apply guardrail flags keyed by delta id. Unknown ids are ignored.
pub fn apply_guardrails(deltas: &mut [Delta], flags: &BTreeMap<String, GuardrailFlags>) {
    for delta in deltas.iter_mut() {
        if let Some(flags) = flags.get(&delta.id) {
            if apply_guardrail_flags(delta, flags) {
                tracing::debug!(delta = %delta.id, level = %delta.risk_level, "guardrail upgraded risk");
            }
        }
    }
}
