//! Specialized Detectors: format-aware category refinements.
//!
//! A detector looks at a generic delta and may claim it for a more
//! specific category. It never creates or drops deltas, and the delta id
//! is left alone so refinements stay traceable.

use crate::delta::{Category, Delta};
use crate::normalize::file_name;
use std::collections::BTreeMap;

pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    /// The refined category, or `None` to leave the delta alone.
    fn refine(&self, delta: &Delta) -> Option<Category>;
}

/// `application*.yml|yaml|properties` overlays become `spring_profile`.
pub struct EnvironmentProfileDetector;

impl Detector for EnvironmentProfileDetector {
    fn name(&self) -> &'static str {
        "environment_profile"
    }

    fn refine(&self, delta: &Delta) -> Option<Category> {
        if delta.category != Category::Config {
            return None;
        }
        let name = file_name(&delta.file).to_lowercase();
        let is_profile = name.starts_with("application")
            && [".yml", ".yaml", ".properties"]
                .iter()
                .any(|ext| name.ends_with(ext));
        is_profile.then_some(Category::SpringProfile)
    }
}

/// `Jenkinsfile*` summaries become `jenkins`.
pub struct PipelineDetector;

impl Detector for PipelineDetector {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn refine(&self, delta: &Delta) -> Option<Category> {
        (delta.category == Category::Config && file_name(&delta.file).starts_with("Jenkinsfile"))
            .then_some(Category::Jenkins)
    }
}

/// `Dockerfile*` base images become `container`.
pub struct ContainerImageDetector;

impl Detector for ContainerImageDetector {
    fn name(&self) -> &'static str {
        "container_image"
    }

    fn refine(&self, delta: &Delta) -> Option<Category> {
        (delta.category == Category::Config && file_name(&delta.file).starts_with("Dockerfile"))
            .then_some(Category::Container)
    }
}

pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(EnvironmentProfileDetector),
        Box::new(PipelineDetector),
        Box::new(ContainerImageDetector),
    ]
}

/// Run detectors over every delta. The first detector that claims a delta
/// wins; its name is recorded in `detection_sources`.
pub fn apply_detectors(deltas: &mut [Delta], detectors: &[Box<dyn Detector>]) {
    for delta in deltas.iter_mut() {
        for detector in detectors {
            if let Some(category) = detector.refine(delta) {
                delta.category = category;
                let source = detector.name().to_string();
                if !delta.detection_sources.contains(&source) {
                    delta.detection_sources.push(source);
                }
                break;
            }
        }
    }
}

/// Collapse duplicate deltas: same id and the same change. The first
/// occurrence keeps its fields; detection sources are unioned and a missing
/// line hint is filled in. Deltas that share an id but disagree on what
/// changed are all kept.
pub fn merge_by_id(deltas: Vec<Delta>) -> Vec<Delta> {
    let mut position: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut out: Vec<Delta> = Vec::with_capacity(deltas.len());
    for delta in deltas {
        let seen = position.entry(delta.id.clone()).or_default();
        match seen.iter().copied().find(|&i| same_change(&out[i], &delta)) {
            Some(index) => {
                let kept = &mut out[index];
                for source in delta.detection_sources {
                    if !kept.detection_sources.contains(&source) {
                        kept.detection_sources.push(source);
                    }
                }
                if kept.line_hint.is_none() {
                    kept.line_hint = delta.line_hint;
                }
            }
            None => {
                if !seen.is_empty() {
                    tracing::warn!(id = %delta.id, "distinct deltas share an id; keeping both");
                }
                seen.push(out.len());
                out.push(delta);
            }
        }
    }
    out
}

fn same_change(a: &Delta, b: &Delta) -> bool {
    a.file == b.file
        && a.locator == b.locator
        && a.category == b.category
        && a.change_type == b.change_type
        && a.old_value == b.old_value
        && a.new_value == b.new_value
}

/// Whether a file name marks a production profile.
pub fn is_production_profile(file: &str) -> bool {
    let name = file_name(file).to_lowercase();
    name.contains("prod") || name.contains(".production")
}
