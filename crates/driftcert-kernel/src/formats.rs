//! Parsers from raw config text into the canonical [`Node`] tree.
//!
//! Each parser takes the file path only to label its `ParseError`.

use crate::error::ParseError;
use crate::tree::Node;
use serde::Deserialize;
use std::collections::BTreeMap;

/// YAML, including multi-document streams.
///
/// A single document becomes the root. Several documents become a
/// sequence (null documents dropped) so that `[1].server.port` addresses
/// the second document.
pub fn parse_yaml(path: &str, text: &str) -> Result<Node, ParseError> {
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| ParseError::new(path, "yaml", e))?;
        if !value.is_null() {
            docs.push(Node::from(&value));
        }
    }
    Ok(match docs.len() {
        0 => Node::default(),
        1 => docs.remove(0),
        _ => Node::Seq(docs),
    })
}

pub fn parse_json(path: &str, text: &str) -> Result<Node, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ParseError::new(path, "json", e))?;
    Ok(Node::from(&value))
}

pub fn parse_toml(path: &str, text: &str) -> Result<Node, ParseError> {
    let table: toml::Table = text
        .parse()
        .map_err(|e: toml::de::Error| ParseError::new(path, "toml", e.message()))?;
    Ok(Node::from(&toml::Value::Table(table)))
}

/// Java-style properties. Keys stay flat (`spring.datasource.url` is one
/// key). Lines without a separator are ignored.
pub fn parse_properties(text: &str) -> Node {
    let mut map = BTreeMap::new();
    for line in logical_lines(text) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        let Some(split) = trimmed.find(|c: char| c == '=' || c == ':') else {
            continue;
        };
        let key = trimmed[..split].trim();
        if key.is_empty() {
            continue;
        }
        let value = trimmed[split + 1..].trim();
        map.insert(key.to_string(), Node::leaf(value));
    }
    Node::Map(map)
}

/// Join backslash-continued lines.
fn logical_lines(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending: Option<String> = None;
    for raw in text.lines() {
        let piece = match pending.take() {
            Some(mut head) => {
                head.push_str(raw.trim_start());
                head
            }
            None => raw.to_string(),
        };
        let trailing = piece.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            pending = Some(piece[..piece.len() - 1].to_string());
        } else {
            out.push(piece);
        }
    }
    out.extend(pending);
    out
}

/// INI files. `[section]` nests its keys; keys before the first section sit
/// at the root. `;` and `#` start comments. A section may not share its
/// name with a top-level key.
pub fn parse_ini(path: &str, text: &str) -> Result<Node, ParseError> {
    let mut root: BTreeMap<String, Node> = BTreeMap::new();
    let mut section: Option<String> = None;
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('[') {
            let name = rest.strip_suffix(']').ok_or_else(|| {
                ParseError::new(
                    path,
                    "ini",
                    format!("unclosed section header on line {}", index + 1),
                )
            })?;
            let name = name.trim().to_string();
            let slot = root
                .entry(name.clone())
                .or_insert_with(|| Node::Map(BTreeMap::new()));
            if !matches!(slot, Node::Map(_)) {
                return Err(ParseError::new(
                    path,
                    "ini",
                    format!(
                        "section [{name}] on line {} reuses the name of a top-level key",
                        index + 1
                    ),
                ));
            }
            section = Some(name);
            continue;
        }
        let Some(split) = trimmed.find(|c: char| c == '=' || c == ':') else {
            continue;
        };
        let key = trimmed[..split].trim().to_string();
        let value = Node::leaf(trimmed[split + 1..].trim());
        match &section {
            Some(name) => {
                if let Some(Node::Map(entries)) = root.get_mut(name) {
                    entries.insert(key, value);
                }
            }
            None => {
                root.insert(key, value);
            }
        }
    }
    Ok(Node::Map(root))
}

#[derive(Default)]
struct XmlFrame {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<(String, Node)>,
    text: String,
}

impl XmlFrame {
    fn into_node(self) -> (String, Node) {
        let text = self.text.trim().to_string();
        if self.attrs.is_empty() && self.children.is_empty() {
            return (self.name, Node::Leaf(text));
        }
        let mut map: BTreeMap<String, Node> = BTreeMap::new();
        for (key, value) in self.attrs {
            map.insert(format!("@{key}"), Node::Leaf(value));
        }
        for (key, node) in self.children {
            match map.remove(&key) {
                None => {
                    map.insert(key, node);
                }
                Some(Node::Seq(mut items)) if !key.starts_with('@') => {
                    items.push(node);
                    map.insert(key, Node::Seq(items));
                }
                Some(previous) => {
                    map.insert(key, Node::Seq(vec![previous, node]));
                }
            }
        }
        if !text.is_empty() {
            map.insert("#text".to_string(), Node::Leaf(text));
        }
        (self.name, Node::Map(map))
    }
}

/// XML into a tag-path tree rooted at `{root_tag: ...}`.
///
/// Attributes become `@name` keys, repeated sibling tags become sequences,
/// and mixed text is kept under `#text`.
pub fn parse_xml(path: &str, text: &str) -> Result<Node, ParseError> {
    use quick_xml::Reader;
    use quick_xml::events::{BytesStart, Event};

    let err = |message: String| ParseError::new(path, "xml", message);

    let open = |e: &BytesStart<'_>| -> Result<XmlFrame, ParseError> {
        let mut frame = XmlFrame {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            ..XmlFrame::default()
        };
        for attr in e.attributes() {
            let attr = attr.map_err(|e| err(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attr.value).into_owned();
            let value = quick_xml::escape::unescape(&raw)
                .map(|v| v.into_owned())
                .unwrap_or(raw);
            frame.attrs.push((key, value));
        }
        Ok(frame)
    };

    let mut reader = Reader::from_str(text);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlFrame> = Vec::new();
    let mut root: Option<(String, Node)> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| err(e.to_string()))?;
        match event {
            Event::Start(ref e) => stack.push(open(e)?),
            Event::Empty(ref e) => {
                let finished = open(e)?.into_node();
                attach(&mut stack, &mut root, finished);
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| err("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, frame.into_node());
            }
            Event::Text(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    let raw = String::from_utf8_lossy(e).into_owned();
                    let value = quick_xml::escape::unescape(&raw)
                        .map(|v| v.into_owned())
                        .unwrap_or(raw);
                    frame.text.push_str(&value);
                }
            }
            Event::CData(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::GeneralRef(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    let name = String::from_utf8_lossy(e).into_owned();
                    frame.text.push_str(&resolve_entity(&name));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(err(format!("unclosed element <{}>", open.name)));
    }
    let (name, node) = root.ok_or_else(|| err("no root element".to_string()))?;
    Ok(Node::Map(BTreeMap::from([(name, node)])))
}

fn attach(stack: &mut [XmlFrame], root: &mut Option<(String, Node)>, finished: (String, Node)) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(finished),
        None => {
            if root.is_none() {
                *root = Some(finished);
            }
        }
    }
}

fn resolve_entity(name: &str) -> String {
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        _ => {
            let code = name
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()));
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| format!("&{name};"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    fn flat(node: &Node) -> Vec<(String, String)> {
        node.leaves(&Locator::root())
            .into_iter()
            .map(|(loc, v)| (loc.render(), v))
            .collect()
    }

    #[test]
    fn yaml_single_document_is_the_root() {
        let node = parse_yaml("a.yml", "server:\n  port: 8080\n").unwrap();
        assert_eq!(flat(&node), vec![("server.port".into(), "8080".into())]);
    }

    #[test]
    fn yaml_multi_document_becomes_sequence() {
        let text = "a: 1\n---\n---\nb: 2\n";
        let node = parse_yaml("a.yml", text).unwrap();
        assert_eq!(
            flat(&node),
            vec![("[0].a".into(), "1".into()), ("[1].b".into(), "2".into())]
        );
    }

    #[test]
    fn yaml_empty_is_empty_map() {
        assert_eq!(parse_yaml("a.yml", "").unwrap(), Node::default());
    }

    #[test]
    fn yaml_syntax_error_is_parse_error() {
        let err = parse_yaml("bad.yml", "a: [1, 2\n").unwrap_err();
        assert_eq!(err.path, "bad.yml");
        assert_eq!(err.format, "yaml");
    }

    #[test]
    fn toml_tables_nest() {
        let node = parse_toml("c.toml", "[db]\nurl = \"x\"\npool = 4\n").unwrap();
        assert_eq!(
            flat(&node),
            vec![("db.pool".into(), "4".into()), ("db.url".into(), "x".into())]
        );
        assert!(parse_toml("c.toml", "[db\n").is_err());
    }

    #[test]
    fn properties_handle_comments_separators_and_continuations() {
        let text = "# comment\n! also comment\nspring.datasource.url=jdbc:x\nserver.port: 8080\nlong=a\\\n    b\nnoseparator\n";
        let node = parse_properties(text);
        assert_eq!(
            flat(&node),
            vec![
                ("long".into(), "ab".into()),
                ("server.port".into(), "8080".into()),
                ("spring.datasource.url".into(), "jdbc:x".into()),
            ]
        );
    }

    #[test]
    fn ini_sections_prefix_keys() {
        let text = "top=1\n; note\n[db]\nhost = h\n";
        let node = parse_ini("a.ini", text).unwrap();
        assert_eq!(
            flat(&node),
            vec![("db.host".into(), "h".into()), ("top".into(), "1".into())]
        );
        assert!(parse_ini("a.ini", "[db\nx=1\n").is_err());
    }

    #[test]
    fn ini_section_named_like_a_root_key_is_rejected() {
        let err = parse_ini("a.ini", "db = legacy\n[db]\nhost = h\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "parse error in a.ini (ini): section [db] on line 2 reuses the name of a top-level key"
        );
        // Repeated sections still merge.
        let node = parse_ini("a.ini", "[db]\nhost = h\n[db]\nport = 1\n").unwrap();
        assert_eq!(
            flat(&node),
            vec![("db.host".into(), "h".into()), ("db.port".into(), "1".into())]
        );
    }

    #[test]
    fn xml_attributes_repeats_and_text() {
        let text = r#"<config env="prod"><item>a</item><item>b &amp; c</item><name>svc</name></config>"#;
        let node = parse_xml("c.xml", text).unwrap();
        assert_eq!(
            flat(&node),
            vec![
                ("config.@env".into(), "prod".into()),
                ("config.item[0]".into(), "a".into()),
                ("config.item[1]".into(), "b & c".into()),
                ("config.name".into(), "svc".into()),
            ]
        );
    }

    #[test]
    fn xml_unclosed_element_is_parse_error() {
        assert!(parse_xml("c.xml", "<config><a>1</a>").is_err());
        assert!(parse_xml("c.xml", "<config><a>1</b></config>").is_err());
    }
}
