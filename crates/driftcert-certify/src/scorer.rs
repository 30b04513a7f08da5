//! Confidence Scorer & Decision Engine.
//!
//! One transition per run. Each factor yields a named signed component;
//! the score is `clamp(base + Σ components, 0, 100)`. The decision is
//! forced to `BLOCK_MERGE` whenever any counted delta is medium or worse,
//! otherwise it follows the environment's thresholds.

use crate::context::{
    BlastRadiusInfo, ChangeContext, DescriptionQuality, EvidenceInfo, HistoricalContext,
    LlmSafetyInput, RunContext,
};
use crate::counts::{PolicyViolation, RiskCounts};
use crate::error::CertifyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const BASE_SCORE: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    AutoMerge,
    HumanReview,
    BlockMerge,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::AutoMerge => "AUTO_MERGE",
            Decision::HumanReview => "HUMAN_REVIEW",
            Decision::BlockMerge => "BLOCK_MERGE",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn from_score(score: i32) -> Self {
        if score >= 80 {
            ConfidenceLevel::High
        } else if score >= 60 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "HIGH",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::Low => "LOW",
        }
    }
}

/// Scorer input when run on its own rather than from the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreRequest {
    pub risk_counts: Option<RiskCounts>,
    pub policy_violations: Vec<PolicyViolation>,
    pub context: RunContext,
}

/// Created once per run; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceScoreResult {
    pub score: i32,
    pub component_breakdown: BTreeMap<String, i32>,
    pub decision: Decision,
    pub decision_rule: String,
    pub confidence_level: ConfidenceLevel,
    pub explanation: String,
}

/// Score a request. Fails only when the risk counts are missing.
pub fn score(request: &ScoreRequest) -> Result<ConfidenceScoreResult, CertifyError> {
    let counts = request
        .risk_counts
        .as_ref()
        .ok_or_else(|| CertifyError::IncompleteInput("risk_counts".to_string()))?;
    Ok(score_run(counts, &request.policy_violations, &request.context))
}

pub fn score_run(
    counts: &RiskCounts,
    violations: &[PolicyViolation],
    context: &RunContext,
) -> ConfidenceScoreResult {
    let components = [
        ("base", BASE_SCORE),
        ("policy_deduction", policy_deduction(violations)),
        ("risk_deduction", risk_deduction(counts)),
        ("blast_radius_penalty", -blast_radius_penalty(context.blast_radius.as_ref())),
        ("history_adjustment", history_adjustment(context.history.as_ref())),
        ("llm_safety_adjustment", llm_safety_adjustment(context.llm_safety.as_ref())),
        ("context_bonus", context_bonus(context.change.as_ref())),
        ("evidence_adjustment", evidence_adjustment(context.evidence.as_ref())),
    ];
    let raw: i32 = components.iter().map(|(_, value)| value).sum();
    let score = raw.clamp(0, 100);

    let (auto, review) = context.environment.thresholds();
    let env = context.environment;
    let (decision, decision_rule) = if counts.blocking() > 0 {
        (
            Decision::BlockMerge,
            format!(
                "CRITICAL RULE: {} counted delta(s) at medium severity or above",
                counts.blocking()
            ),
        )
    } else if score >= auto {
        (
            Decision::AutoMerge,
            format!("{env} threshold: score {score} >= {auto}"),
        )
    } else if score >= review {
        (
            Decision::HumanReview,
            format!("{env} threshold: score {score} >= {review} but below {auto}"),
        )
    } else {
        (
            Decision::BlockMerge,
            format!("{env} threshold: score {score} below {review}"),
        )
    };

    let confidence_level = ConfidenceLevel::from_score(score);
    let explanation = format!(
        "Confidence score {score}/100 ({}). {decision_rule}. Dominant factors: {}.",
        confidence_level.as_str(),
        dominant_factors(&components)
    );
    tracing::debug!(score, raw, decision = %decision, "run scored");

    ConfidenceScoreResult {
        score,
        component_breakdown: components
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect(),
        decision,
        decision_rule,
        confidence_level,
        explanation,
    }
}

/// Up to two non-base components, largest magnitude first, ties by name.
fn dominant_factors(components: &[(&str, i32)]) -> String {
    let mut factors: Vec<&(&str, i32)> = components
        .iter()
        .filter(|(name, value)| *name != "base" && *value != 0)
        .collect();
    factors.sort_by(|a, b| b.1.abs().cmp(&a.1.abs()).then(a.0.cmp(b.0)));
    if factors.is_empty() {
        return "none".to_string();
    }
    factors
        .iter()
        .take(2)
        .map(|(name, value)| format!("{name} ({value:+})"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Uncapped sum of per-violation deductions.
pub fn policy_deduction(violations: &[PolicyViolation]) -> i32 {
    violations.iter().map(PolicyViolation::deduction).sum()
}

/// One branch only; the most severe non-empty bucket decides.
pub fn risk_deduction(counts: &RiskCounts) -> i32 {
    if counts.critical > 0 {
        -80
    } else if counts.high > 0 {
        -60
    } else if counts.medium > 0 {
        -55
    } else {
        -(counts.low.saturating_mul(2).min(60) as i32)
    }
}

/// Magnitude of the penalty, in `[0, 50]`.
pub fn blast_radius_penalty(info: Option<&BlastRadiusInfo>) -> i32 {
    let Some(info) = info else {
        return 0;
    };
    let files = if info.files_affected > 5 {
        10
    } else if info.files_affected > 3 {
        5
    } else {
        0
    };
    let critical = info.critical_files.saturating_mul(5).min(50) as i32;
    let services = (info.downstream_services.len().saturating_mul(3)).min(15) as i32;
    (info.scope.base_penalty() + files + critical + services).min(50)
}

/// In `[-20, +10]`.
pub fn history_adjustment(history: Option<&HistoricalContext>) -> i32 {
    let Some(h) = history else {
        return 0;
    };
    let mut adj = 0;
    if h.outage_history {
        adj -= 20;
    } else if h.past_failures > 0 {
        adj -= h.past_failures.saturating_mul(5).min(15) as i32;
    }
    if h.trust_level < 0.3 {
        adj -= 10;
    } else if h.trust_level > 0.8 {
        adj += 10;
    }
    if h.past_successes > 5 && h.past_failures == 0 {
        adj += 10;
    } else if h.past_successes > 0 {
        adj += h.past_successes.saturating_mul(2).min(5) as i32;
    }
    adj.clamp(-20, 10)
}

/// In `[-20, +15]`; zero without a signal.
pub fn llm_safety_adjustment(llm: Option<&LlmSafetyInput>) -> i32 {
    let Some(llm) = llm else {
        return 0;
    };
    let safety = if llm.safety_probability < 0.3 {
        -20
    } else if llm.safety_probability < 0.5 {
        -10
    } else if llm.safety_probability > 0.8 {
        15
    } else if llm.safety_probability > 0.6 {
        5
    } else {
        0
    };
    let anomaly = if llm.anomaly_score > 0.7 {
        -15
    } else if llm.anomaly_score > 0.5 {
        -10
    } else if llm.anomaly_score > 0.3 {
        -5
    } else {
        0
    };
    (safety + anomaly).clamp(-20, 15)
}

/// In `[0, 25]`.
pub fn context_bonus(change: Option<&ChangeContext>) -> i32 {
    let Some(c) = change else {
        return 0;
    };
    let flag = |set: bool, points: i32| if set { points } else { 0 };
    let quality = match c.description_quality {
        DescriptionQuality::High => 5,
        DescriptionQuality::Medium => 2,
        DescriptionQuality::Low => 0,
    };
    let bonus = flag(c.has_tags, 5)
        + flag(c.has_issue_link, 5)
        + flag(c.has_rollback_plan, 10)
        + flag(c.has_test_evidence, 5)
        + quality;
    bonus.min(25)
}

pub fn evidence_adjustment(evidence: Option<&EvidenceInfo>) -> i32 {
    let Some(e) = evidence else {
        return 0;
    };
    if !e.missing.is_empty() {
        -20
    } else if !e.found.is_empty() {
        20
    } else {
        0
    }
}
