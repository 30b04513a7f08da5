//! Locators: the exact address of a delta within a file.
//!
//! A locator is either a path from the root of a file's canonical tree
//! (`spring.datasource.url`, `FROM[0]`) or a 1-based inclusive line range
//! for text hunks. Locators render to a stable string form which is what
//! the risk classifier and policy tagger match keywords against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step in a tree path: a map key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Where a delta occurred.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Locator {
    /// Path from the canonical tree root.
    PathInTree { segments: Vec<PathSegment> },

    /// Inclusive 1-based line range in the candidate file.
    LineRange { start: usize, end: usize },
}

impl Locator {
    /// The empty tree path (a file's root).
    pub fn root() -> Self {
        Locator::PathInTree {
            segments: Vec::new(),
        }
    }

    pub fn path<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PathSegment>,
    {
        Locator::PathInTree {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn lines(start: usize, end: usize) -> Self {
        Locator::LineRange {
            start,
            end: end.max(start),
        }
    }

    /// A new tree locator one segment deeper. Line ranges have no children
    /// and are returned unchanged.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        match self {
            Locator::PathInTree { segments } => {
                let mut next = segments.clone();
                next.push(segment.into());
                Locator::PathInTree { segments: next }
            }
            Locator::LineRange { .. } => self.clone(),
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        match self {
            Locator::PathInTree { segments } => segments,
            Locator::LineRange { .. } => &[],
        }
    }

    /// The innermost map key on the path, used for line hints.
    pub fn last_key(&self) -> Option<&str> {
        self.segments().iter().rev().find_map(|segment| match segment {
            PathSegment::Key(key) => Some(key.as_str()),
            PathSegment::Index(_) => None,
        })
    }

    /// Stable string form: keys joined by `.`, indices as `[i]`.
    pub fn render(&self) -> String {
        match self {
            Locator::PathInTree { segments } => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        PathSegment::Key(key) => {
                            if !out.is_empty() {
                                out.push('.');
                            }
                            out.push_str(key);
                        }
                        PathSegment::Index(index) => {
                            out.push('[');
                            out.push_str(&index.to_string());
                            out.push(']');
                        }
                    }
                }
                out
            }
            Locator::LineRange { start, end } => format!("L{start}-L{end}"),
        }
    }

    /// Unambiguous string form used in delta ids. Same as [`Locator::render`]
    /// except that a key which is empty or holds `.`, `[`, `]`, `"` or `\`
    /// is written as `["..."]` with `"` and `\` backslash-escaped, so a
    /// flat key `a.b` and the nested path `a` → `b` never share an id.
    pub fn encoded(&self) -> String {
        let Locator::PathInTree { segments } = self else {
            return self.render();
        };
        let mut out = String::new();
        for segment in segments {
            match segment {
                PathSegment::Key(key) if needs_quoting(key) => {
                    out.push_str("[\"");
                    for c in key.chars() {
                        if matches!(c, '"' | '\\') {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push_str("\"]");
                }
                PathSegment::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathSegment::Index(index) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        out
    }

    /// Lowercased rendering, the form keyword rules match against.
    pub fn match_key(&self) -> String {
        self.render().to_lowercase()
    }

    /// Case-insensitive substring test on the rendered locator.
    pub fn contains(&self, needle: &str) -> bool {
        self.match_key().contains(&needle.to_lowercase())
    }
}

fn needs_quoting(key: &str) -> bool {
    key.is_empty() || key.contains(['.', '[', ']', '"', '\\'])
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_keys_and_indices() {
        let loc = Locator::root()
            .child("spring")
            .child("datasource")
            .child("password");
        assert_eq!(loc.render(), "spring.datasource.password");

        let from = Locator::path(["FROM"]).child(0usize);
        assert_eq!(from.render(), "FROM[0]");
        assert!(from.contains("from["));

        let nested = Locator::root().child(1usize).child("server").child("port");
        assert_eq!(nested.render(), "[1].server.port");
    }

    #[test]
    fn encoded_form_separates_flat_and_nested_keys() {
        let flat = Locator::path(["a.b"]);
        let nested = Locator::path(["a", "b"]);
        assert_eq!(flat.render(), nested.render());
        assert_eq!(flat.encoded(), r#"["a.b"]"#);
        assert_eq!(nested.encoded(), "a.b");

        let mixed = Locator::path(["properties", "slf4j.version"]).child(0usize);
        assert_eq!(mixed.encoded(), r#"properties["slf4j.version"][0]"#);
        assert_eq!(Locator::path(["[0]"]).encoded(), r#"["[0]"]"#);
        assert_ne!(Locator::path(["[0]"]).encoded(), Locator::root().child(0usize).encoded());
        assert_eq!(Locator::path([r#"q"\"#]).encoded(), r#"["q\"\\"]"#);
        assert_ne!(Locator::path([""]).encoded(), Locator::root().encoded());
        assert_eq!(Locator::lines(2, 5).encoded(), "L2-L5");
    }

    #[test]
    fn line_ranges_render_and_normalize() {
        assert_eq!(Locator::lines(4, 9).render(), "L4-L9");
        assert_eq!(Locator::lines(7, 3), Locator::LineRange { start: 7, end: 7 });
        assert_eq!(Locator::lines(4, 9).last_key(), None);
    }

    #[test]
    fn last_key_skips_indices() {
        let loc = Locator::path(["credentials", "ids"]).child(2usize);
        assert_eq!(loc.last_key(), Some("ids"));
    }

    #[test]
    fn contains_is_case_insensitive() {
        let loc = Locator::path(["Spring", "DataSource", "URL"]);
        assert!(loc.contains("datasource.url"));
        assert!(!loc.contains("password"));
    }

    #[test]
    fn serde_shape_is_tagged() {
        let loc = Locator::path(["a"]).child(0usize);
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json, serde_json::json!({"type": "path_in_tree", "segments": ["a", 0]}));
        let back: Locator = serde_json::from_value(json).unwrap();
        assert_eq!(back, loc);
    }
}
