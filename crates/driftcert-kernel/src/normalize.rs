//! Format Normalizer: detect a file's format and parse it into canonical
//! form.

use crate::descriptors;
use crate::error::ParseError;
use crate::formats;
use crate::hash::ContentHash;
use crate::manifest::{self, Manifest};
use crate::snapshot::FileBlob;
use crate::tree::Node;
use serde::{Deserialize, Serialize};
use std::fmt;

const SNIFF_LEN: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Yaml,
    Json,
    Toml,
    Properties,
    Ini,
    Xml,
    MavenPom,
    PackageJson,
    Requirements,
    GoMod,
    Pipeline,
    Container,
    Text,
    Binary,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Yaml => "yaml",
            FileFormat::Json => "json",
            FileFormat::Toml => "toml",
            FileFormat::Properties => "properties",
            FileFormat::Ini => "ini",
            FileFormat::Xml => "xml",
            FileFormat::MavenPom => "maven_pom",
            FileFormat::PackageJson => "package_json",
            FileFormat::Requirements => "requirements",
            FileFormat::GoMod => "go_mod",
            FileFormat::Pipeline => "pipeline",
            FileFormat::Container => "container",
            FileFormat::Text => "text",
            FileFormat::Binary => "binary",
        }
    }

    /// Detect by file name first, then by content (binary sniff), then by
    /// extension. Unknown text falls back to [`FileFormat::Text`].
    pub fn detect(path: &str, bytes: &[u8]) -> Self {
        let name = file_name(path);
        if name.starts_with("Jenkinsfile") {
            return FileFormat::Pipeline;
        }
        if name.starts_with("Dockerfile") {
            return FileFormat::Container;
        }
        match name {
            "pom.xml" => return FileFormat::MavenPom,
            "package.json" => return FileFormat::PackageJson,
            "requirements.txt" => return FileFormat::Requirements,
            "go.mod" => return FileFormat::GoMod,
            _ => {}
        }
        if looks_binary(bytes) {
            return FileFormat::Binary;
        }
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "yml" | "yaml" => FileFormat::Yaml,
            "json" => FileFormat::Json,
            "toml" => FileFormat::Toml,
            "properties" | "conf" | "cfg" | "config" => FileFormat::Properties,
            "ini" => FileFormat::Ini,
            "xml" => FileFormat::Xml,
            _ => FileFormat::Text,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final path component.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// NUL in the first 8 KiB, or invalid UTF-8 anywhere.
pub fn looks_binary(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    head.contains(&0) || std::str::from_utf8(bytes).is_err()
}

/// Parsed content of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Key/value markup and summarized descriptors. `text` is kept for
    /// line hints.
    Tree { root: Node, text: String },
    Manifest { manifest: Manifest, text: String },
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn kind(&self) -> &'static str {
        match self {
            Content::Tree { .. } => "tree",
            Content::Manifest { .. } => "manifest",
            Content::Text(_) => "text",
            Content::Binary(_) => "binary",
        }
    }

    /// Source text, if the content is textual.
    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Tree { text, .. } | Content::Manifest { text, .. } => Some(text),
            Content::Text(text) => Some(text),
            Content::Binary(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFile {
    pub path: String,
    pub format: FileFormat,
    pub hash: ContentHash,
    pub content: Content,
}

/// Parse one snapshot file into canonical form.
pub fn normalize(path: &str, blob: &FileBlob) -> Result<NormalizedFile, ParseError> {
    let format = FileFormat::detect(path, &blob.bytes);
    let content = match format {
        FileFormat::Binary => Content::Binary(blob.bytes.clone()),
        _ => {
            let text = decode(path, format, &blob.bytes)?;
            parse_text(path, format, text)?
        }
    };
    tracing::debug!(path, format = %format, kind = content.kind(), "normalized");
    Ok(NormalizedFile {
        path: path.to_string(),
        format,
        hash: blob.hash.clone(),
        content,
    })
}

fn decode(path: &str, format: FileFormat, bytes: &[u8]) -> Result<String, ParseError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ParseError::new(path, format.as_str(), format!("invalid utf-8: {e}")))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

fn parse_text(path: &str, format: FileFormat, text: String) -> Result<Content, ParseError> {
    let as_tree = |root: Node, text: String| Content::Tree { root, text };
    let as_manifest = |manifest: Manifest, text: String| Content::Manifest { manifest, text };
    Ok(match format {
        FileFormat::Yaml => as_tree(formats::parse_yaml(path, &text)?, text),
        FileFormat::Json => as_tree(formats::parse_json(path, &text)?, text),
        FileFormat::Toml => as_tree(formats::parse_toml(path, &text)?, text),
        FileFormat::Properties => as_tree(formats::parse_properties(&text), text),
        FileFormat::Ini => as_tree(formats::parse_ini(path, &text)?, text),
        FileFormat::Xml => as_tree(formats::parse_xml(path, &text)?, text),
        FileFormat::Pipeline => as_tree(descriptors::summarize_pipeline(&text), text),
        FileFormat::Container => as_tree(descriptors::summarize_container(&text), text),
        FileFormat::MavenPom => as_manifest(manifest::parse_pom(path, &text)?, text),
        FileFormat::PackageJson => as_manifest(manifest::parse_package_json(path, &text)?, text),
        FileFormat::Requirements => as_manifest(manifest::parse_requirements(&text), text),
        FileFormat::GoMod => as_manifest(manifest::parse_go_mod(&text), text),
        FileFormat::Text => Content::Text(text),
        FileFormat::Binary => Content::Binary(text.into_bytes()),
    })
}
