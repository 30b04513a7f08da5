//! Line hunks for text files no structured parser understands.

use crate::delta::{Category, ChangeType, Delta};
use crate::locator::Locator;
use regex::Regex;
use similar::{ChangeTag, TextDiff};
use std::sync::OnceLock;

pub const MAX_HUNKS: usize = 400;
pub const MAX_SNIPPET_CHARS: usize = 4000;
const CONTEXT_LINES: usize = 3;

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(//|#|--|/\*|\*|<!--|;)").expect("comment regex must compile")
    })
}

/// True when every non-blank changed line is a comment.
fn is_comment_only<'a>(lines: impl IntoIterator<Item = &'a str>) -> bool {
    let mut total = 0;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        total += 1;
        if !comment_re().is_match(line) {
            return false;
        }
    }
    total > 0
}

/// One `code_hunk` delta per changed region, located by its 1-based line
/// range in the candidate file.
pub fn diff_text(file: &str, golden: &str, candidate: &str) -> Vec<Delta> {
    let diff = TextDiff::from_lines(golden, candidate);
    let mut out = Vec::new();

    for group in diff.grouped_ops(CONTEXT_LINES) {
        if out.len() >= MAX_HUNKS {
            tracing::debug!(file, limit = MAX_HUNKS, "hunk limit reached");
            break;
        }
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };

        let mut deleted: Vec<&str> = Vec::new();
        let mut inserted: Vec<&str> = Vec::new();
        for op in &group {
            for change in diff.iter_changes(op) {
                match change.tag() {
                    ChangeTag::Delete => deleted.push(change.value()),
                    ChangeTag::Insert => inserted.push(change.value()),
                    ChangeTag::Equal => {}
                }
            }
        }
        if is_comment_only(deleted.iter().chain(inserted.iter()).copied()) {
            continue;
        }

        let new_start = first.new_range().start + 1;
        let new_end = last.new_range().end;
        let change_type = match (deleted.is_empty(), inserted.is_empty()) {
            (true, false) => ChangeType::Added,
            (false, true) => ChangeType::Removed,
            _ => ChangeType::Modified,
        };
        out.push(
            Delta::new(
                Category::CodeHunk,
                file,
                Locator::lines(new_start, new_end),
                change_type,
                snippet(&deleted),
                snippet(&inserted),
            )
            .with_line_hint(Some(new_start)),
        );
    }
    out
}

fn snippet(lines: &[&str]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    let joined: String = lines.concat();
    Some(joined.chars().take(MAX_SNIPPET_CHARS).collect())
}
