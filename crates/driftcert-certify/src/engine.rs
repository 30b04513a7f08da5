//! The full pipeline: two snapshots, a policy and a run context in; a
//! replayable certification record out.

use crate::context::{LlmSafetyInput, RunContext};
use crate::counts::{RiskCounts, policy_violations};
use crate::error::CertifyError;
use crate::scorer::{ConfidenceScoreResult, score_run};
use driftcert_kernel::{
    ContentHash, Delta, DependencyDelta, Snapshot, StructuralDiff, UnparseableFile,
    default_detectors, detect_drift,
};
use driftcert_policy::{PolicyConfig, apply_guardrails, apply_judgments, classify_all, tag_all};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Counts for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSummary {
    pub total_deltas: usize,
    pub files_with_drift: usize,
    pub files_added: usize,
    pub files_removed: usize,
    pub files_modified: usize,
    pub files_renamed: usize,
    pub files_unparseable: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_risk_level: BTreeMap<String, usize>,
    pub by_policy_tag: BTreeMap<String, usize>,
    pub risk_counts: RiskCounts,
}

impl DriftSummary {
    fn build(
        structural: &StructuralDiff,
        deltas: &[Delta],
        unparseable: &[UnparseableFile],
        risk_counts: RiskCounts,
    ) -> Self {
        let mut by_category = BTreeMap::new();
        let mut by_risk_level = BTreeMap::new();
        let mut by_policy_tag = BTreeMap::new();
        for delta in deltas {
            *by_category.entry(delta.category.to_string()).or_insert(0) += 1;
            *by_risk_level.entry(delta.risk_level.to_string()).or_insert(0) += 1;
            *by_policy_tag.entry(delta.policy_tag.to_string()).or_insert(0) += 1;
        }
        let files: BTreeSet<&str> = deltas.iter().map(|d| d.file.as_str()).collect();
        let unparseable_paths: BTreeSet<&str> =
            unparseable.iter().map(|u| u.path.as_str()).collect();
        Self {
            total_deltas: deltas.len(),
            files_with_drift: files.len(),
            files_added: structural.added.len(),
            files_removed: structural.removed.len(),
            files_modified: structural.modified.len(),
            files_renamed: structural.renamed.len(),
            files_unparseable: unparseable_paths.len(),
            by_category,
            by_risk_level,
            by_policy_tag,
            risk_counts,
        }
    }
}

/// Everything a run produces. Identical inputs give an identical record
/// and therefore an identical `digest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOutput {
    pub structural: StructuralDiff,
    pub deltas: Vec<Delta>,
    pub dependency_deltas: Vec<DependencyDelta>,
    pub unparseable: Vec<UnparseableFile>,
    pub summary: DriftSummary,
    pub score: ConfidenceScoreResult,
    /// sha256 of the canonical JSON of every other field.
    pub digest: String,
}

impl EngineOutput {
    /// Recompute the digest from the other fields.
    pub fn compute_digest(&self) -> Result<String, CertifyError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("digest");
        }
        Ok(ContentHash::from_json(&value)?.0)
    }
}

/// Run stages 1 through 7.
///
/// The policy is mandatory; everything in `context` is optional.
pub fn run_engine(
    golden: &Snapshot,
    candidate: &Snapshot,
    policy: Option<&PolicyConfig>,
    context: &RunContext,
) -> Result<EngineOutput, CertifyError> {
    let policy =
        policy.ok_or_else(|| CertifyError::IncompleteInput("policy config".to_string()))?;

    let report = detect_drift(golden, candidate, &default_detectors());
    let mut deltas = report.deltas;

    classify_all(&mut deltas);
    tag_all(&mut deltas, policy);
    apply_judgments(&mut deltas, &context.judgments);
    apply_guardrails(&mut deltas, &context.guardrail_flags);

    let risk_counts = RiskCounts::from_deltas(&deltas);
    let mut violations = policy_violations(&deltas);
    violations.extend(context.external_violations.iter().cloned());

    let score = match effective_llm_safety(context, &deltas) {
        Some(llm) if context.llm_safety.is_none() => {
            let derived = RunContext {
                llm_safety: Some(llm),
                ..context.clone()
            };
            score_run(&risk_counts, &violations, &derived)
        }
        _ => score_run(&risk_counts, &violations, context),
    };

    let summary = DriftSummary::build(&report.structural, &deltas, &report.unparseable, risk_counts);
    let mut output = EngineOutput {
        structural: report.structural,
        deltas,
        dependency_deltas: report.dependency_deltas,
        unparseable: report.unparseable,
        summary,
        score,
        digest: String::new(),
    };
    output.digest = output.compute_digest()?;

    tracing::debug!(
        deltas = output.summary.total_deltas,
        score = output.score.score,
        decision = %output.score.decision,
        digest = %output.digest,
        "run certified"
    );
    Ok(output)
}

/// Load both trees from disk, then [`run_engine`].
pub fn run_engine_on_dirs(
    golden_dir: impl AsRef<Path>,
    candidate_dir: impl AsRef<Path>,
    policy: Option<&PolicyConfig>,
    context: &RunContext,
) -> Result<EngineOutput, CertifyError> {
    let golden = Snapshot::from_dir(golden_dir)?;
    let candidate = Snapshot::from_dir(candidate_dir)?;
    run_engine(&golden, &candidate, policy, context)
}

/// The run-level signal, or, without one, the most cautious per-delta
/// values among judgments that apply to this run's deltas.
fn effective_llm_safety(context: &RunContext, deltas: &[Delta]) -> Option<LlmSafetyInput> {
    if context.llm_safety.is_some() {
        return context.llm_safety;
    }
    let judged = deltas.iter().filter_map(|d| context.judgments.get(&d.id));
    let mut safety: Option<f64> = None;
    let mut anomaly: Option<f64> = None;
    for judgment in judged {
        if let Some(p) = judgment.safety_probability {
            safety = Some(safety.map_or(p, |s| s.min(p)));
        }
        if let Some(a) = judgment.anomaly_score {
            anomaly = Some(anomaly.map_or(a, |s| s.max(a)));
        }
    }
    match (safety, anomaly) {
        (None, None) => None,
        // A missing half is neutral: 0.5 safety, 0 anomaly.
        (safety, anomaly) => Some(LlmSafetyInput {
            safety_probability: safety.unwrap_or(0.5),
            anomaly_score: anomaly.unwrap_or(0.0),
        }),
    }
}
