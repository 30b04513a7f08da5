//! Pipeline and container descriptors, summarized into small trees.
//!
//! Neither format is parsed fully. A pipeline definition is reduced to the
//! handful of keys that matter for promotion risk; a container descriptor
//! to its ordered list of base images.

use crate::tree::Node;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn agent_kind_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"agent\s+([a-zA-Z_][a-zA-Z0-9_]*)").expect("agent regex must compile")
    })
}

fn agent_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"label\s*[:=]\s*['"]([^'"]+)['"]"#).expect("label regex must compile")
    })
}

fn docker_image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)docker\s*\{\s*image\s+['"]([^'"]+)['"]"#)
            .expect("docker image regex must compile")
    })
}

fn credentials_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"credentialsId\s*[:=]\s*['"]([^'"]+)['"]"#)
            .expect("credentials regex must compile")
    })
}

fn library_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"@Library\(['"]([^'"]+)['"]\)"#).expect("library regex must compile")
    })
}

fn stage_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"stage\s*\(\s*['"]([^'"]+)['"]\s*\)"#).expect("stage regex must compile")
    })
}

/// Summarize a `Jenkinsfile` into `agent.kind`, `agent.label`,
/// `agent.docker.image`, `credentials.ids`, `libraries` and `stages`.
///
/// Keys with no match are omitted. Credential ids are de-duplicated in
/// first-seen order.
pub fn summarize_pipeline(text: &str) -> Node {
    let mut root: BTreeMap<String, Node> = BTreeMap::new();
    let mut agent: BTreeMap<String, Node> = BTreeMap::new();

    if let Some(caps) = agent_kind_re().captures(text) {
        agent.insert("kind".into(), Node::leaf(&caps[1]));
    }
    if let Some(caps) = agent_label_re().captures(text) {
        agent.insert("label".into(), Node::leaf(&caps[1]));
    }
    if let Some(caps) = docker_image_re().captures(text) {
        let docker = BTreeMap::from([("image".to_string(), Node::leaf(&caps[1]))]);
        agent.insert("docker".into(), Node::Map(docker));
    }
    if !agent.is_empty() {
        root.insert("agent".into(), Node::Map(agent));
    }

    let mut ids: Vec<String> = Vec::new();
    for caps in credentials_re().captures_iter(text) {
        let id = caps[1].to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if !ids.is_empty() {
        let ids = BTreeMap::from([("ids".to_string(), seq(ids))]);
        root.insert("credentials".into(), Node::Map(ids));
    }

    let libraries: Vec<String> = library_re()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();
    if !libraries.is_empty() {
        root.insert("libraries".into(), seq(libraries));
    }

    let stages: Vec<String> = stage_re()
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();
    if !stages.is_empty() {
        root.insert("stages".into(), seq(stages));
    }

    Node::Map(root)
}

fn seq(items: Vec<String>) -> Node {
    Node::Seq(items.into_iter().map(Node::Leaf).collect())
}

/// Base images of a `Dockerfile`, in order, under `FROM`.
pub fn summarize_container(text: &str) -> Node {
    let bases: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| {
            line.get(..5)
                .is_some_and(|head| head.eq_ignore_ascii_case("FROM "))
        })
        .map(|line| line[5..].trim().to_string())
        .collect();
    if bases.is_empty() {
        return Node::default();
    }
    Node::Map(BTreeMap::from([("FROM".to_string(), seq(bases))]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    const JENKINSFILE: &str = r#"@Library('shared-lib') _
pipeline {
  agent {
    docker { image 'maven:3.9-eclipse-temurin-17' }
  }
  stages {
    stage('Build') {
      steps {
        withCredentials([usernamePassword(credentialsId: 'nexus-creds', usernameVariable: 'U')]) { sh 'mvn -B package' }
      }
    }
    stage('Deploy') {
      steps { withCredentials([string(credentialsId: 'nexus-creds', variable: 'T')]) { sh './deploy.sh' } }
    }
  }
}
"#;

    #[test]
    fn pipeline_summary_keys() {
        let node = summarize_pipeline(JENKINSFILE);
        let rendered: Vec<(String, String)> = node
            .leaves(&Locator::root())
            .into_iter()
            .map(|(loc, v)| (loc.render(), v))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("agent.docker.image".into(), "maven:3.9-eclipse-temurin-17".into()),
                ("credentials.ids[0]".into(), "nexus-creds".into()),
                ("libraries[0]".into(), "shared-lib".into()),
                ("stages[0]".into(), "Build".into()),
                ("stages[1]".into(), "Deploy".into()),
            ]
        );
    }

    #[test]
    fn pipeline_agent_kind_and_label() {
        let node = summarize_pipeline("pipeline { agent any }\nnode(label: 'linux') {}");
        assert_eq!(node.get_path("agent.kind").and_then(Node::as_leaf), Some("any"));
        assert_eq!(node.get_path("agent.label").and_then(Node::as_leaf), Some("linux"));
    }

    #[test]
    fn pipeline_without_matches_is_empty() {
        assert_eq!(summarize_pipeline("echo hi"), Node::default());
    }

    #[test]
    fn container_base_images_in_order() {
        let text = "FROM maven:3.9 AS build\nRUN mvn package\nfrom eclipse-temurin:17-jre\n";
        let node = summarize_container(text);
        let leaves = node.leaves(&Locator::root());
        assert_eq!(leaves[0].0.render(), "FROM[0]");
        assert_eq!(leaves[0].1, "maven:3.9 AS build");
        assert_eq!(leaves[1].1, "eclipse-temurin:17-jre");
    }
}
