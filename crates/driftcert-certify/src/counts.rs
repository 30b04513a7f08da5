//! Aggregates over a classified, tagged delta set.

use driftcert_kernel::{Delta, PolicyTag, RiskLevel};
use serde::{Deserialize, Serialize};

/// Counts per risk level. Allowed-variance deltas are counted separately
/// and in no risk bucket, so the five fields sum to the delta total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub allowed_variance: u32,
}

impl RiskCounts {
    pub fn from_deltas(deltas: &[Delta]) -> Self {
        let mut counts = Self::default();
        for delta in deltas {
            if !delta.is_counted() {
                counts.allowed_variance += 1;
                continue;
            }
            match delta.risk_level {
                RiskLevel::Critical => counts.critical += 1,
                RiskLevel::High => counts.high += 1,
                RiskLevel::Medium => counts.medium += 1,
                RiskLevel::Low => counts.low += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u32 {
        self.critical + self.high + self.medium + self.low + self.allowed_variance
    }

    /// Deltas at medium severity or above, which trigger the override.
    pub fn blocking(&self) -> u32 {
        self.critical + self.high + self.medium
    }
}

/// One policy violation observed in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    #[serde(default)]
    pub delta_id: Option<String>,
    pub rule: String,
    pub severity: RiskLevel,
}

impl PolicyViolation {
    /// Per-violation score deduction.
    pub fn deduction(&self) -> i32 {
        match self.severity {
            RiskLevel::Critical => -30,
            RiskLevel::High => -15,
            RiskLevel::Medium => -5,
            RiskLevel::Low => 0,
        }
    }
}

/// Every invariant breach, at `max(risk_level, high)`.
pub fn policy_violations(deltas: &[Delta]) -> Vec<PolicyViolation> {
    deltas
        .iter()
        .filter(|d| d.policy_tag == PolicyTag::InvariantBreach)
        .map(|d| PolicyViolation {
            delta_id: Some(d.id.clone()),
            rule: d.policy_rule.clone().unwrap_or_else(|| "invariant".to_string()),
            severity: d.risk_level.max(RiskLevel::High),
        })
        .collect()
}
