//! The canonical key/value tree every structured format normalizes into.
//!
//! Maps are key-sorted (`BTreeMap`) so that walking two trees is
//! deterministic regardless of the source document's key order. Scalars
//! are kept in their rendered string form; the engine compares sanitized
//! values as opaque strings.

use crate::locator::Locator;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(String),
    Map(BTreeMap<String, Node>),
    Seq(Vec<Node>),
}

impl Default for Node {
    fn default() -> Self {
        Node::Map(BTreeMap::new())
    }
}

impl Node {
    pub fn leaf(value: impl Into<String>) -> Self {
        Node::Leaf(value.into())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Every leaf under this node with its full locator, in walk order.
    pub fn leaves(&self, at: &Locator) -> Vec<(Locator, String)> {
        let mut out = Vec::new();
        collect_leaves(self, at, &mut out);
        out
    }

    /// Follow a dotted path of map keys. Test and lookup helper.
    pub fn get_path(&self, dotted: &str) -> Option<&Node> {
        let mut current = self;
        for key in dotted.split('.') {
            match current {
                Node::Map(map) => current = map.get(key)?,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Node::Leaf(value) => Some(value),
            _ => None,
        }
    }
}

fn collect_leaves(node: &Node, at: &Locator, out: &mut Vec<(Locator, String)>) {
    match node {
        Node::Leaf(value) => out.push((at.clone(), value.clone())),
        Node::Map(map) => {
            for (key, child) in map {
                collect_leaves(child, &at.child(key.as_str()), out);
            }
        }
        Node::Seq(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_leaves(child, &at.child(index), out);
            }
        }
    }
}

impl From<&serde_json::Value> for Node {
    fn from(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Node::leaf("null"),
            Value::Bool(b) => Node::leaf(b.to_string()),
            Value::Number(n) => Node::leaf(n.to_string()),
            Value::String(s) => Node::leaf(s.clone()),
            Value::Array(items) => Node::Seq(items.iter().map(Node::from).collect()),
            Value::Object(map) => Node::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Node::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&serde_yaml::Value> for Node {
    fn from(value: &serde_yaml::Value) -> Self {
        use serde_yaml::Value;
        match value {
            Value::Null => Node::leaf("null"),
            Value::Bool(b) => Node::leaf(b.to_string()),
            Value::Number(n) => Node::leaf(n.to_string()),
            Value::String(s) => Node::leaf(s.clone()),
            Value::Sequence(items) => Node::Seq(items.iter().map(Node::from).collect()),
            Value::Mapping(map) => Node::Map(
                map.iter()
                    .map(|(k, v)| (yaml_key(k), Node::from(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Node::from(&tagged.value),
        }
    }
}

fn yaml_key(key: &serde_yaml::Value) -> String {
    use serde_yaml::Value;
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

impl From<&toml::Value> for Node {
    fn from(value: &toml::Value) -> Self {
        use toml::Value;
        match value {
            Value::String(s) => Node::leaf(s.clone()),
            Value::Integer(i) => Node::leaf(i.to_string()),
            Value::Float(f) => Node::leaf(f.to_string()),
            Value::Boolean(b) => Node::leaf(b.to_string()),
            Value::Datetime(dt) => Node::leaf(dt.to_string()),
            Value::Array(items) => Node::Seq(items.iter().map(Node::from).collect()),
            Value::Table(table) => Node::Map(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), Node::from(v)))
                    .collect(),
            ),
        }
    }
}

/// First 1-based line that mentions the locator's innermost key, skipping
/// `#` comment lines.
pub fn line_hint(text: &str, locator: &Locator) -> Option<usize> {
    let key = locator.last_key()?;
    let tail = key.rsplit('.').next().unwrap_or(key);
    if tail.is_empty() {
        return None;
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim_start().starts_with('#'))
        .find(|(_, line)| line.contains(tail))
        .map(|(index, _)| index + 1)
}
