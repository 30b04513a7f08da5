//! Build manifests: dependency maps and build properties.

use crate::delta::Ecosystem;
use crate::error::ParseError;
use crate::formats;
use crate::tree::Node;
use std::collections::BTreeMap;

/// A parsed build manifest.
///
/// `dependencies` maps package to version string. An empty version means
/// the manifest pins none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub ecosystem: Ecosystem,
    pub dependencies: BTreeMap<String, String>,
    pub properties: BTreeMap<String, String>,
}

impl Manifest {
    fn new(ecosystem: Ecosystem) -> Self {
        Self {
            ecosystem,
            dependencies: BTreeMap::new(),
            properties: BTreeMap::new(),
        }
    }
}

/// Maven `pom.xml`: `groupId:artifactId -> version`, with `${prop}`
/// versions resolved from `<properties>`.
pub fn parse_pom(path: &str, text: &str) -> Result<Manifest, ParseError> {
    let tree = formats::parse_xml(path, text)?;
    let mut manifest = Manifest::new(Ecosystem::Maven);

    let Some(project) = tree.get_path("project") else {
        return Ok(manifest);
    };

    if let Some(Node::Map(props)) = project.get_path("properties") {
        for (key, value) in props {
            if let Node::Leaf(value) = value {
                manifest.properties.insert(key.clone(), value.clone());
            }
        }
    }

    let deps = match project.get_path("dependencies.dependency") {
        Some(Node::Seq(items)) => items.iter().collect::<Vec<_>>(),
        Some(single) => vec![single],
        None => Vec::new(),
    };
    for dep in deps {
        let group = dep.get_path("groupId").and_then(Node::as_leaf);
        let artifact = dep.get_path("artifactId").and_then(Node::as_leaf);
        let (Some(group), Some(artifact)) = (group, artifact) else {
            continue;
        };
        let version = dep
            .get_path("version")
            .and_then(Node::as_leaf)
            .unwrap_or_default();
        let version = resolve_property(version, &manifest.properties);
        manifest
            .dependencies
            .insert(format!("{group}:{artifact}"), version);
    }
    Ok(manifest)
}

fn resolve_property(version: &str, properties: &BTreeMap<String, String>) -> String {
    version
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .and_then(|name| properties.get(name))
        .cloned()
        .unwrap_or_else(|| version.to_string())
}

/// npm `package.json`: `dependencies` merged with `devDependencies`.
pub fn parse_package_json(path: &str, text: &str) -> Result<Manifest, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ParseError::new(path, "package.json", e))?;
    let mut manifest = Manifest::new(Ecosystem::Npm);
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = value.get(section).and_then(|v| v.as_object()) {
            for (name, version) in deps {
                let version = match version {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                manifest.dependencies.insert(name.clone(), version);
            }
        }
    }
    Ok(manifest)
}

/// pip `requirements.txt`. `name==version` pins; any other specifier is
/// kept verbatim as the version.
pub fn parse_requirements(text: &str) -> Manifest {
    let mut manifest = Manifest::new(Ecosystem::Pip);
    for line in text.lines() {
        let line = match line.find(" #") {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        if let Some((name, version)) = line.split_once("==") {
            manifest
                .dependencies
                .insert(name.trim().to_string(), version.trim().to_string());
            continue;
        }
        let split = line
            .find(|c: char| matches!(c, '<' | '>' | '~' | '!' | '=' | ';' | '['))
            .unwrap_or(line.len());
        let (name, specifier) = line.split_at(split);
        manifest
            .dependencies
            .insert(name.trim().to_string(), specifier.trim().to_string());
    }
    manifest
}

/// Go `go.mod` `require` directives, single-line and block form.
pub fn parse_go_mod(text: &str) -> Manifest {
    let mut manifest = Manifest::new(Ecosystem::Go);
    let mut in_block = false;
    for line in text.lines() {
        let line = match line.find("//") {
            Some(idx) => &line[..idx],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if in_block {
            if line == ")" {
                in_block = false;
            } else {
                insert_go_requirement(&mut manifest, line);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim();
            if rest == "(" {
                in_block = true;
            } else {
                insert_go_requirement(&mut manifest, rest);
            }
        } else if let Some(rest) = line.strip_prefix("go ") {
            manifest
                .properties
                .insert("go".to_string(), rest.trim().to_string());
        }
    }
    manifest
}

fn insert_go_requirement(manifest: &mut Manifest, line: &str) {
    let mut parts = line.split_whitespace();
    if let (Some(module), Some(version)) = (parts.next(), parts.next()) {
        manifest
            .dependencies
            .insert(module.to_string(), version.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<?xml version="1.0"?>
<project>
  <properties>
    <slf4j.version>2.0.9</slf4j.version>
    <java.version>17</java.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>org.slf4j</groupId>
      <artifactId>slf4j-api</artifactId>
      <version>${slf4j.version}</version>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
    </dependency>
  </dependencies>
</project>
"#;

    #[test]
    fn pom_resolves_property_versions() {
        let m = parse_pom("pom.xml", POM).unwrap();
        assert_eq!(m.ecosystem, Ecosystem::Maven);
        assert_eq!(m.dependencies["org.slf4j:slf4j-api"], "2.0.9");
        assert_eq!(m.dependencies["junit:junit"], "");
        assert_eq!(m.properties["java.version"], "17");
    }

    #[test]
    fn pom_single_dependency_is_not_a_sequence() {
        let text = "<project><dependencies><dependency><groupId>g</groupId><artifactId>a</artifactId><version>${missing}</version></dependency></dependencies></project>";
        let m = parse_pom("pom.xml", text).unwrap();
        assert_eq!(m.dependencies["g:a"], "${missing}");
    }

    #[test]
    fn package_json_merges_dev_dependencies() {
        let text = r#"{"dependencies":{"express":"^4.18.2"},"devDependencies":{"jest":"29.0.0"}}"#;
        let m = parse_package_json("package.json", text).unwrap();
        assert_eq!(m.dependencies.len(), 2);
        assert_eq!(m.dependencies["jest"], "29.0.0");
        assert!(parse_package_json("package.json", "{").is_err());
    }

    #[test]
    fn requirements_pins_and_specifiers() {
        let text = "# deps\nrequests==2.31.0\nflask>=2.0 # web\nnumpy\n-r other.txt\n";
        let m = parse_requirements(text);
        assert_eq!(m.dependencies["requests"], "2.31.0");
        assert_eq!(m.dependencies["flask"], ">=2.0");
        assert_eq!(m.dependencies["numpy"], "");
        assert_eq!(m.dependencies.len(), 3);
    }

    #[test]
    fn go_mod_require_forms() {
        let text = "module example.com/svc\n\ngo 1.22\n\nrequire github.com/a/b v1.2.3\nrequire (\n\tgithub.com/c/d v0.4.0 // indirect\n)\n";
        let m = parse_go_mod(text);
        assert_eq!(m.dependencies["github.com/a/b"], "v1.2.3");
        assert_eq!(m.dependencies["github.com/c/d"], "v0.4.0");
        assert_eq!(m.properties["go"], "1.22");
    }
}
