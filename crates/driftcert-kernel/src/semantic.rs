//! Semantic Differ: key-level deltas for paired canonical files.
//!
//! Either side of a pair may be absent. An absent side diffs as empty, so
//! every leaf of an added file is emitted as `added` and every leaf of a
//! removed file as `removed`.

use crate::binary;
use crate::delta::{Category, ChangeType, Delta, DependencyDelta};
use crate::hunks;
use crate::locator::Locator;
use crate::manifest::Manifest;
use crate::normalize::{Content, NormalizedFile};
use crate::tree::{Node, line_hint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Deltas found in one file.
///
/// `deltas` includes the generic view of each dependency delta, so the
/// classifier sees every change through one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub file: String,
    pub deltas: Vec<Delta>,
    pub dependencies: Vec<DependencyDelta>,
}

/// One path to diff, with whichever sides exist.
#[derive(Debug, Clone, Copy)]
pub struct FilePair<'a> {
    pub path: &'a str,
    pub golden: Option<&'a NormalizedFile>,
    pub candidate: Option<&'a NormalizedFile>,
}

/// Walk two trees in sorted-key order and emit `config` deltas.
///
/// Sequences compare index-wise. When the node kind differs at a locator
/// (leaf vs map, say), every old leaf below it is removed and every new
/// leaf added.
pub fn diff_trees(file: &str, golden: Option<&Node>, candidate: Option<&Node>) -> Vec<Delta> {
    let mut out = Vec::new();
    walk(file, golden, candidate, &Locator::root(), &mut out);
    out
}

fn walk(file: &str, old: Option<&Node>, new: Option<&Node>, at: &Locator, out: &mut Vec<Delta>) {
    match (old, new) {
        (None, None) => {}
        (Some(Node::Leaf(a)), Some(Node::Leaf(b))) => {
            if a != b {
                out.push(config_delta(
                    file,
                    at.clone(),
                    ChangeType::Modified,
                    Some(a.clone()),
                    Some(b.clone()),
                ));
            }
        }
        (Some(Node::Map(a)), Some(Node::Map(b))) => {
            let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
            for key in keys {
                walk(file, a.get(key), b.get(key), &at.child(key.as_str()), out);
            }
        }
        (Some(Node::Seq(a)), Some(Node::Seq(b))) => {
            for index in 0..a.len().max(b.len()) {
                walk(file, a.get(index), b.get(index), &at.child(index), out);
            }
        }
        (old, new) => {
            if let Some(old) = old {
                for (loc, value) in old.leaves(at) {
                    out.push(config_delta(file, loc, ChangeType::Removed, Some(value), None));
                }
            }
            if let Some(new) = new {
                for (loc, value) in new.leaves(at) {
                    out.push(config_delta(file, loc, ChangeType::Added, None, Some(value)));
                }
            }
        }
    }
}

fn config_delta(
    file: &str,
    locator: Locator,
    change_type: ChangeType,
    old: Option<String>,
    new: Option<String>,
) -> Delta {
    Delta::new(Category::Config, file, locator, change_type, old, new)
}

/// Dependency and build-property transitions between two manifests.
pub fn diff_manifests(
    file: &str,
    golden: Option<&Manifest>,
    candidate: Option<&Manifest>,
) -> (Vec<DependencyDelta>, Vec<Delta>) {
    let Some(ecosystem) = candidate.or(golden).map(|m| m.ecosystem) else {
        return (Vec::new(), Vec::new());
    };
    let empty = BTreeMap::new();
    let old_deps = golden.map(|m| &m.dependencies).unwrap_or(&empty);
    let new_deps = candidate.map(|m| &m.dependencies).unwrap_or(&empty);

    let dependencies = map_transitions(old_deps, new_deps)
        .into_iter()
        .map(|(package, from, to, change_type)| DependencyDelta {
            file: file.to_string(),
            ecosystem,
            package,
            from_version: from,
            to_version: to,
            change_type,
        })
        .collect();

    let old_props = golden.map(|m| &m.properties).unwrap_or(&empty);
    let new_props = candidate.map(|m| &m.properties).unwrap_or(&empty);
    let properties = map_transitions(old_props, new_props)
        .into_iter()
        .map(|(key, from, to, change_type)| {
            Delta::new(
                Category::BuildConfig,
                file,
                Locator::path(["properties", key.as_str()]),
                change_type,
                from,
                to,
            )
        })
        .collect();

    (dependencies, properties)
}

type Transition = (String, Option<String>, Option<String>, ChangeType);

fn map_transitions(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
) -> Vec<Transition> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let change_type = match (old.get(key), new.get(key)) {
                (Some(a), Some(b)) if a == b => return None,
                (Some(_), Some(_)) => ChangeType::Modified,
                (Some(_), None) => ChangeType::Removed,
                (None, Some(_)) => ChangeType::Added,
                (None, None) => return None,
            };
            Some((
                key.clone(),
                old.get(key).cloned(),
                new.get(key).cloned(),
                change_type,
            ))
        })
        .collect()
}

/// Diff one path. Dispatch is on the parsed content kind of each side.
pub fn diff_pair(pair: FilePair<'_>) -> FileDiff {
    let file = pair.path;
    let old = pair.golden.map(|f| &f.content);
    let new = pair.candidate.map(|f| &f.content);
    let old_text = old.and_then(Content::text);
    let new_text = new.and_then(Content::text);

    let mut diff = FileDiff {
        file: file.to_string(),
        ..FileDiff::default()
    };

    match (old, new) {
        (None, None) => {}
        (Some(Content::Tree { .. }) | None, Some(Content::Tree { .. }) | None) => {
            diff.deltas = diff_trees(file, tree_root(old), tree_root(new));
        }
        (Some(Content::Manifest { .. }) | None, Some(Content::Manifest { .. }) | None) => {
            let (dependencies, properties) = diff_manifests(file, manifest_of(old), manifest_of(new));
            diff.deltas = dependencies.iter().map(DependencyDelta::to_delta).collect();
            diff.deltas.extend(properties);
            diff.dependencies = dependencies;
        }
        (Some(Content::Text(a)), Some(Content::Text(b))) => {
            diff.deltas = hunks::diff_text(file, a, b);
        }
        (Some(Content::Binary(a)), Some(Content::Binary(b))) => {
            diff.deltas = binary::diff_binary(file, a, b);
        }
        // Added or removed text and binary files are covered by their
        // file-presence delta.
        (Some(Content::Text(_) | Content::Binary(_)), None)
        | (None, Some(Content::Text(_) | Content::Binary(_))) => {}
        (Some(a), Some(b)) => {
            diff.deltas.push(Delta::new(
                Category::Other,
                file,
                Locator::path([file]),
                ChangeType::Modified,
                Some(a.kind().to_string()),
                Some(b.kind().to_string()),
            ));
        }
    }

    for delta in &mut diff.deltas {
        if delta.line_hint.is_some() {
            continue;
        }
        let hint = match delta.category {
            Category::Dependency => dependency_hint(new_text, old_text, &delta.locator),
            Category::CodeHunk | Category::Other | Category::BinaryMeta => None,
            _ => new_text
                .and_then(|text| line_hint(text, &delta.locator))
                .or_else(|| old_text.and_then(|text| line_hint(text, &delta.locator))),
        };
        delta.line_hint = hint;
    }
    diff
}

fn tree_root(content: Option<&Content>) -> Option<&Node> {
    match content {
        Some(Content::Tree { root, .. }) => Some(root),
        _ => None,
    }
}

fn manifest_of(content: Option<&Content>) -> Option<&Manifest> {
    match content {
        Some(Content::Manifest { manifest, .. }) => Some(manifest),
        _ => None,
    }
}

/// Package names like `group:artifact` are located by their last part.
fn dependency_hint(new_text: Option<&str>, old_text: Option<&str>, locator: &Locator) -> Option<usize> {
    let package = locator.last_key()?;
    let needle = package.rsplit(':').next().unwrap_or(package);
    let find = |text: &str| {
        text.lines()
            .position(|line| line.contains(needle))
            .map(|index| index + 1)
    };
    new_text.and_then(find).or_else(|| old_text.and_then(find))
}

/// Diff many paths. Runs on the rayon pool when the `parallel` feature is
/// on; output is sorted by path either way.
pub fn diff_files(pairs: &[FilePair<'_>]) -> Vec<FileDiff> {
    #[cfg(feature = "parallel")]
    let iter = pairs.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = pairs.iter();

    let mut out: Vec<FileDiff> = iter.map(|pair| diff_pair(*pair)).collect();
    out.sort_by(|a, b| a.file.cmp(&b.file));
    out
}
