//! Risk Classifier: delta → baseline `(risk_level, risk_reason)`.
//!
//! Rules are tried in a fixed order and the first match wins. Order is the
//! only disambiguation: a `container` delta at `db.password` is rule 1, not
//! rule 2.

use driftcert_kernel::{Category, Delta, RiskLevel, is_production_profile};
use serde::Serialize;

/// Locator tokens marking credentials and connection parameters. Matched
/// against the lowercased locator with `-` and `_` removed.
const SENSITIVE_TOKENS: &[&str] = &[
    "password",
    "secret",
    "token",
    "credentialsid",
    "credentialid",
    "db.password",
    "db.username",
    "dbusername",
    "jdbc.url",
    "jdbcurl",
];

/// Tokens whose separator is significant. Matched against the lowercased
/// locator as is.
const SEPARATED_TOKENS: &[&str] = &["posdb_"];

/// The rule that fired, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRule {
    SensitiveKey,
    PipelineCredentialOrImage,
    ProductionProfile,
    Behavioral,
    NonBehavioral,
    Fallback,
}

impl RiskRule {
    pub fn level(&self) -> RiskLevel {
        match self {
            RiskRule::SensitiveKey
            | RiskRule::PipelineCredentialOrImage
            | RiskRule::ProductionProfile => RiskLevel::High,
            RiskRule::Behavioral => RiskLevel::Medium,
            RiskRule::NonBehavioral | RiskRule::Fallback => RiskLevel::Low,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            RiskRule::SensitiveKey => "sensitive credential or connection parameter changed",
            RiskRule::PipelineCredentialOrImage => "pipeline credential or base image changed",
            RiskRule::ProductionProfile => "production profile changed",
            RiskRule::Behavioral => "behavioral or version/configuration change",
            RiskRule::NonBehavioral => "non-behavioral or metadata change",
            RiskRule::Fallback => "default low risk",
        }
    }
}

/// The first rule matching `delta`.
pub fn match_rule(delta: &Delta) -> RiskRule {
    let locator = delta.locator.match_key();
    let squashed: String = locator.chars().filter(|c| !matches!(c, '-' | '_')).collect();

    if SENSITIVE_TOKENS.iter().any(|token| squashed.contains(token))
        || SEPARATED_TOKENS.iter().any(|token| locator.contains(token))
    {
        return RiskRule::SensitiveKey;
    }
    match delta.category {
        Category::Jenkins | Category::Container
            if locator.contains("credentials") || locator.contains("from[") =>
        {
            RiskRule::PipelineCredentialOrImage
        }
        Category::SpringProfile if is_production_profile(&delta.file) => {
            RiskRule::ProductionProfile
        }
        Category::CodeHunk
        | Category::Dependency
        | Category::BuildConfig
        | Category::SpringProfile
        | Category::Config => RiskRule::Behavioral,
        Category::File
        | Category::Table
        | Category::BinaryMeta
        | Category::ArchiveDelta
        | Category::ArchiveManifest
        | Category::Other => RiskRule::NonBehavioral,
        Category::Jenkins | Category::Container => RiskRule::Fallback,
    }
}

pub fn classify(delta: &Delta) -> (RiskLevel, &'static str) {
    let rule = match_rule(delta);
    (rule.level(), rule.reason())
}

/// Set the baseline risk on every delta. Overwrites, so run this before
/// any upgrade.
pub fn classify_all(deltas: &mut [Delta]) {
    for delta in deltas.iter_mut() {
        let (level, reason) = classify(delta);
        delta.risk_level = level;
        delta.risk_reason = reason.to_string();
    }
}
