//! Structural Differ: file-level added/removed/modified/renamed sets.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Path sets, each sorted. A path appears in at most one set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub renamed: Vec<Rename>,
}

impl StructuralDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && self.renamed.is_empty()
    }
}

/// Compare two `path -> hash` maps.
///
/// Removed/added pairs with identical content hash become renames. When a
/// hash is shared by several removed and several added paths, pairs are
/// taken greedily by smallest path edit distance; ties fall back to input
/// (path) order of the removed path, then of the added path.
pub fn diff_structure(
    golden: &BTreeMap<String, ContentHash>,
    candidate: &BTreeMap<String, ContentHash>,
) -> StructuralDiff {
    let mut added: Vec<&String> = Vec::new();
    let mut removed: Vec<&String> = Vec::new();
    let mut modified: Vec<String> = Vec::new();

    for (path, hash) in golden {
        match candidate.get(path) {
            None => removed.push(path),
            Some(other) if other != hash => modified.push(path.clone()),
            Some(_) => {}
        }
    }
    for path in candidate.keys() {
        if !golden.contains_key(path) {
            added.push(path);
        }
    }

    // Arena: hash -> input positions of removed and added paths.
    let mut arena: BTreeMap<&ContentHash, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for (pos, path) in removed.iter().enumerate() {
        arena.entry(&golden[*path]).or_default().0.push(pos);
    }
    for (pos, path) in added.iter().enumerate() {
        if let Some(slot) = arena.get_mut(&candidate[*path]) {
            slot.1.push(pos);
        }
    }

    let mut paired_removed = BTreeSet::new();
    let mut paired_added = BTreeSet::new();
    let mut renamed = Vec::new();

    for (removed_pos, added_pos) in arena.values() {
        if removed_pos.is_empty() || added_pos.is_empty() {
            continue;
        }
        let mut pairs: Vec<(usize, usize, usize)> = Vec::new();
        for &r in removed_pos {
            for &a in added_pos {
                pairs.push((edit_distance(removed[r], added[a]), r, a));
            }
        }
        pairs.sort_unstable();
        for (_, r, a) in pairs {
            if paired_removed.contains(&r) || paired_added.contains(&a) {
                continue;
            }
            paired_removed.insert(r);
            paired_added.insert(a);
            renamed.push(Rename {
                from: removed[r].clone(),
                to: added[a].clone(),
            });
        }
    }
    renamed.sort();

    let diff = StructuralDiff {
        added: added
            .iter()
            .enumerate()
            .filter(|(pos, _)| !paired_added.contains(pos))
            .map(|(_, path)| (*path).clone())
            .collect(),
        removed: removed
            .iter()
            .enumerate()
            .filter(|(pos, _)| !paired_removed.contains(pos))
            .map(|(_, path)| (*path).clone())
            .collect(),
        modified,
        renamed,
    };
    tracing::debug!(
        added = diff.added.len(),
        removed = diff.removed.len(),
        modified = diff.modified.len(),
        renamed = diff.renamed.len(),
        "structural diff"
    );
    diff
}

/// Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, &str)]) -> BTreeMap<String, ContentHash> {
        entries
            .iter()
            .map(|(path, body)| (path.to_string(), ContentHash::from_bytes(body.as_bytes())))
            .collect()
    }

    #[test]
    fn classifies_each_path_once() {
        let golden = index(&[("keep.yml", "a"), ("mod.yml", "b"), ("gone.yml", "c")]);
        let candidate = index(&[("keep.yml", "a"), ("mod.yml", "B"), ("new.yml", "d")]);
        let diff = diff_structure(&golden, &candidate);
        assert_eq!(diff.added, ["new.yml"]);
        assert_eq!(diff.removed, ["gone.yml"]);
        assert_eq!(diff.modified, ["mod.yml"]);
        assert!(diff.renamed.is_empty());
    }

    #[test]
    fn identical_hash_is_a_rename() {
        let golden = index(&[("a.yml", "same")]);
        let candidate = index(&[("b.yml", "same")]);
        let diff = diff_structure(&golden, &candidate);
        assert_eq!(
            diff.renamed,
            vec![Rename {
                from: "a.yml".into(),
                to: "b.yml".into()
            }]
        );
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn ambiguous_renames_pair_by_edit_distance() {
        let golden = index(&[("conf/app-dev.yml", "x"), ("conf/app-prod.yml", "x")]);
        let candidate = index(&[("conf2/app-prod.yml", "x"), ("conf2/app-dev.yml", "x")]);
        let diff = diff_structure(&golden, &candidate);
        assert_eq!(diff.renamed.len(), 2);
        assert_eq!(diff.renamed[0].from, "conf/app-dev.yml");
        assert_eq!(diff.renamed[0].to, "conf2/app-dev.yml");
        assert_eq!(diff.renamed[1].from, "conf/app-prod.yml");
        assert_eq!(diff.renamed[1].to, "conf2/app-prod.yml");
    }

    #[test]
    fn equal_distance_falls_back_to_input_order() {
        let golden = index(&[("x/a", "h")]);
        let candidate = index(&[("y/a", "h"), ("z/a", "h")]);
        let diff = diff_structure(&golden, &candidate);
        assert_eq!(diff.renamed[0].to, "y/a");
        assert_eq!(diff.added, ["z/a"]);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }
}
