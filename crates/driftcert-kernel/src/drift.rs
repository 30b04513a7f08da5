//! Stages 1–4 end to end: snapshots in, located and refined deltas out.

use crate::delta::{Category, ChangeType, Delta, DependencyDelta};
use crate::detectors::{Detector, apply_detectors, merge_by_id};
use crate::hunks::diff_text;
use crate::locator::Locator;
use crate::normalize::{NormalizedFile, normalize};
use crate::semantic::{FilePair, diff_files};
use crate::snapshot::Snapshot;
use crate::structural::{StructuralDiff, diff_structure};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const PRESENT: &str = "present";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Golden,
    Candidate,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Golden => "golden",
            Side::Candidate => "candidate",
        })
    }
}

/// A file excluded from semantic diffing because one side failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnparseableFile {
    pub path: String,
    pub side: Side,
    pub reason: String,
}

/// Everything the differ stages found, before any risk judgment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub structural: StructuralDiff,
    /// Sorted by file; order within a file is detection order.
    pub deltas: Vec<Delta>,
    pub dependency_deltas: Vec<DependencyDelta>,
    pub unparseable: Vec<UnparseableFile>,
}

/// Diff two snapshots.
///
/// Parse failures are absorbed: the path is recorded in `unparseable`.
/// An added or removed path keeps its file-presence delta; a modified one
/// is diffed as plain text instead.
pub fn detect_drift(
    golden: &Snapshot,
    candidate: &Snapshot,
    detectors: &[Box<dyn Detector>],
) -> DriftReport {
    let structural = diff_structure(&golden.hash_index(), &candidate.hash_index());
    let mut unparseable = Vec::new();

    let mut load = |snapshot: &Snapshot, path: &str, side: Side| -> Option<NormalizedFile> {
        let blob = snapshot.get(path)?;
        match normalize(path, blob) {
            Ok(file) => Some(file),
            Err(err) => {
                tracing::warn!(path, side = %side, error = %err, "unparseable file excluded from semantic diff");
                unparseable.push(UnparseableFile {
                    path: path.to_string(),
                    side,
                    reason: err.to_string(),
                });
                None
            }
        }
    };

    // path -> (golden side, candidate side); a failed parse drops the path.
    let mut loaded: BTreeMap<&str, (Option<NormalizedFile>, Option<NormalizedFile>)> =
        BTreeMap::new();
    let mut unparsed = Vec::new();
    for path in &structural.modified {
        let old = load(golden, path, Side::Golden);
        let new = load(candidate, path, Side::Candidate);
        match (old, new) {
            (Some(old), Some(new)) => {
                loaded.insert(path, (Some(old), Some(new)));
            }
            _ => unparsed.extend(unparsed_file_deltas(path, golden, candidate)),
        }
    }
    for path in &structural.added {
        if let Some(new) = load(candidate, path, Side::Candidate) {
            loaded.insert(path, (None, Some(new)));
        }
    }
    for path in &structural.removed {
        if let Some(old) = load(golden, path, Side::Golden) {
            loaded.insert(path, (Some(old), None));
        }
    }

    let pairs: Vec<FilePair<'_>> = loaded
        .iter()
        .map(|(path, (old, new))| FilePair {
            path,
            golden: old.as_ref(),
            candidate: new.as_ref(),
        })
        .collect();
    let file_diffs = diff_files(&pairs);

    let mut deltas = presence_deltas(&structural);
    deltas.extend(unparsed);
    let mut dependency_deltas = Vec::new();
    for diff in file_diffs {
        deltas.extend(diff.deltas);
        dependency_deltas.extend(diff.dependencies);
    }

    apply_detectors(&mut deltas, detectors);
    let mut deltas = merge_by_id(deltas);
    deltas.sort_by(|a, b| a.file.cmp(&b.file));
    unparseable.sort();

    tracing::debug!(
        deltas = deltas.len(),
        dependencies = dependency_deltas.len(),
        unparseable = unparseable.len(),
        "drift detected"
    );
    DriftReport {
        structural,
        deltas,
        dependency_deltas,
        unparseable,
    }
}

/// One `file` delta per added, removed and renamed path.
fn presence_deltas(structural: &StructuralDiff) -> Vec<Delta> {
    let presence = |path: &str, change_type: ChangeType, old: Option<&str>, new: Option<&str>| {
        Delta::new(
            Category::File,
            path,
            Locator::path([path]),
            change_type,
            old.map(str::to_string),
            new.map(str::to_string),
        )
    };
    let mut out = Vec::new();
    for path in &structural.added {
        out.push(presence(path.as_str(), ChangeType::Added, None, Some(PRESENT)));
    }
    for path in &structural.removed {
        out.push(presence(path.as_str(), ChangeType::Removed, Some(PRESENT), None));
    }
    for rename in &structural.renamed {
        out.push(presence(
            rename.to.as_str(),
            ChangeType::Renamed,
            Some(rename.from.as_str()),
            Some(rename.to.as_str()),
        ));
    }
    out
}

/// Line hunks for a modified file that failed to parse on either side. When
/// the text diff reports nothing (binary bytes, comment-only edits) the
/// whole file becomes one hunk, so the change is never lost.
fn unparsed_file_deltas(path: &str, golden: &Snapshot, candidate: &Snapshot) -> Vec<Delta> {
    let (Some(old), Some(new)) = (golden.get(path), candidate.get(path)) else {
        return Vec::new();
    };
    if let (Ok(old_text), Ok(new_text)) =
        (std::str::from_utf8(&old.bytes), std::str::from_utf8(&new.bytes))
    {
        let hunks = diff_text(path, old_text, new_text);
        if !hunks.is_empty() {
            return hunks;
        }
    }
    let lines = String::from_utf8_lossy(&new.bytes).lines().count().max(1);
    vec![Delta::new(
        Category::CodeHunk,
        path,
        Locator::lines(1, lines),
        ChangeType::Modified,
        Some(format!("sha256={}", old.hash)),
        Some(format!("sha256={}", new.hash)),
    )]
}
