//! Run-level inputs supplied by the caller.
//!
//! Every section is optional. An absent section contributes nothing to the
//! score, so a bare `{}` is a valid run context.

use crate::counts::PolicyViolation;
use driftcert_policy::{ContextualJudgment, GuardrailFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Target environment; selects decision thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    #[serde(alias = "prod")]
    Production,
    #[serde(alias = "stage", alias = "pre-production")]
    Staging,
    #[serde(alias = "dev", alias = "testing")]
    Development,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Development => "development",
        }
    }

    /// Minimum scores for `(AUTO_MERGE, HUMAN_REVIEW)`.
    pub fn thresholds(&self) -> (i32, i32) {
        match self {
            Environment::Production => (85, 60),
            Environment::Staging => (75, 50),
            Environment::Development => (65, 50),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "staging" | "stage" | "pre-production" => Ok(Self::Staging),
            "development" | "dev" | "testing" => Ok(Self::Development),
            _ => Err(format!("unknown environment: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactScope {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactScope {
    pub fn base_penalty(&self) -> i32 {
        match self {
            ImpactScope::Low => 5,
            ImpactScope::Medium => 15,
            ImpactScope::High => 25,
            ImpactScope::Critical => 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastRadiusInfo {
    pub files_affected: u32,
    pub critical_files: u32,
    pub downstream_services: Vec<String>,
    pub scope: ImpactScope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalContext {
    pub past_failures: u32,
    pub past_successes: u32,
    pub outage_history: bool,
    /// In `[0, 1]`.
    pub trust_level: f64,
}

impl Default for HistoricalContext {
    fn default() -> Self {
        Self {
            past_failures: 0,
            past_successes: 0,
            outage_history: false,
            trust_level: 0.5,
        }
    }
}

/// The external contextual-risk signal for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LlmSafetyInput {
    pub safety_probability: f64,
    pub anomaly_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionQuality {
    #[default]
    Low,
    Medium,
    High,
}

/// What the change request itself carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeContext {
    pub has_tags: bool,
    pub has_issue_link: bool,
    pub has_rollback_plan: bool,
    pub has_test_evidence: bool,
    pub description_quality: DescriptionQuality,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceInfo {
    pub found: Vec<String>,
    pub missing: Vec<String>,
}

/// Everything a run needs besides the two trees and the policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunContext {
    pub environment: Environment,
    pub blast_radius: Option<BlastRadiusInfo>,
    pub history: Option<HistoricalContext>,
    pub llm_safety: Option<LlmSafetyInput>,
    pub change: Option<ChangeContext>,
    pub evidence: Option<EvidenceInfo>,
    /// Contextual judgments keyed by delta id.
    pub judgments: BTreeMap<String, ContextualJudgment>,
    /// Guardrail flags keyed by delta id.
    pub guardrail_flags: BTreeMap<String, GuardrailFlags>,
    /// Violations observed outside the engine (e.g. a malicious-pattern scan).
    pub external_violations: Vec<PolicyViolation>,
}

impl RunContext {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }
}
