//! The delta data model.
//!
//! A `Delta` is one detected unit of change between golden and candidate.
//! Deltas are created by the differs, refined by detectors, then enriched
//! with risk and policy fields downstream. They are never deleted.

use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of change a delta describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Config,
    Dependency,
    BuildConfig,
    /// Environment-profile overlay (`application-<env>.yml` and friends).
    SpringProfile,
    /// Pipeline definition.
    Jenkins,
    /// Container descriptor.
    Container,
    CodeHunk,
    File,
    Table,
    BinaryMeta,
    ArchiveDelta,
    ArchiveManifest,
    Other,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Config,
        Category::Dependency,
        Category::BuildConfig,
        Category::SpringProfile,
        Category::Jenkins,
        Category::Container,
        Category::CodeHunk,
        Category::File,
        Category::Table,
        Category::BinaryMeta,
        Category::ArchiveDelta,
        Category::ArchiveManifest,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Config => "config",
            Category::Dependency => "dependency",
            Category::BuildConfig => "build_config",
            Category::SpringProfile => "spring_profile",
            Category::Jenkins => "jenkins",
            Category::Container => "container",
            Category::CodeHunk => "code_hunk",
            Category::File => "file",
            Category::Table => "table",
            Category::BinaryMeta => "binary_meta",
            Category::ArchiveDelta => "archive_delta",
            Category::ArchiveManifest => "archive_manifest",
            Category::Other => "other",
        }
    }

    /// Id prefix. Fixed at creation so ids survive detector refinement.
    fn id_prefix(&self) -> &'static str {
        match self {
            Category::Config
            | Category::SpringProfile
            | Category::Jenkins
            | Category::Container
            | Category::BuildConfig => "cfg",
            Category::Dependency => "dep",
            Category::CodeHunk => "hunk",
            Category::File => "file",
            Category::BinaryMeta => "bin",
            Category::ArchiveDelta => "zip",
            Category::ArchiveManifest => "manifest",
            Category::Table | Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
    Renamed,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Removed => "removed",
            ChangeType::Modified => "modified",
            ChangeType::Renamed => "renamed",
        }
    }

    fn marker(&self) -> char {
        match self {
            ChangeType::Added => '+',
            ChangeType::Removed => '-',
            ChangeType::Modified => '~',
            ChangeType::Renamed => '>',
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic severity of a delta. Ordered: `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Critical,
        RiskLevel::High,
        RiskLevel::Medium,
        RiskLevel::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(format!("unknown risk level: {s}")),
        }
    }
}

/// Outcome of applying the allow-list and invariants to a delta.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PolicyTag {
    /// Not yet tagged.
    #[default]
    None,
    /// Not policy-cleared.
    Suspect,
    /// Expected environment variance; excluded from risk counts.
    AllowedVariance,
    /// A hard invariant was violated.
    InvariantBreach,
}

impl PolicyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyTag::None => "none",
            PolicyTag::Suspect => "suspect",
            PolicyTag::AllowedVariance => "allowed_variance",
            PolicyTag::InvariantBreach => "invariant_breach",
        }
    }
}

impl fmt::Display for PolicyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Stable id derived from kind, change type, file and locator.
    pub id: String,
    pub category: Category,
    pub file: String,
    pub locator: Locator,
    pub change_type: ChangeType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,

    /// 1-based line in the candidate (or golden) file mentioning the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_hint: Option<usize>,

    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub policy_tag: PolicyTag,

    /// Which allow-list entry or invariant produced `policy_tag`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_rule: Option<String>,

    /// Detectors that refined this delta's category.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detection_sources: Vec<String>,
}

impl Delta {
    pub fn new(
        category: Category,
        file: impl Into<String>,
        locator: Locator,
        change_type: ChangeType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        let file = file.into();
        let id = format!(
            "{}{}{}#{}",
            category.id_prefix(),
            change_type.marker(),
            file,
            locator.encoded()
        );
        Self {
            id,
            category,
            file,
            locator,
            change_type,
            old_value,
            new_value,
            line_hint: None,
            risk_level: RiskLevel::Low,
            risk_reason: String::new(),
            policy_tag: PolicyTag::None,
            policy_rule: None,
            detection_sources: Vec::new(),
        }
    }

    pub fn with_line_hint(mut self, line: Option<usize>) -> Self {
        self.line_hint = line;
        self
    }

    /// Raise the risk level if `level` is more severe. Never downgrades.
    ///
    /// Returns true if the level changed.
    pub fn upgrade_risk(&mut self, level: RiskLevel, reason: &str) -> bool {
        if level <= self.risk_level {
            return false;
        }
        self.risk_level = level;
        if self.risk_reason.is_empty() {
            self.risk_reason = reason.to_string();
        } else {
            self.risk_reason = format!("{} Upgraded to {level}: {reason}", self.risk_reason);
        }
        true
    }

    /// Whether this delta counts toward risk totals.
    pub fn is_counted(&self) -> bool {
        self.policy_tag != PolicyTag::AllowedVariance
    }
}

/// Build-manifest ecosystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ecosystem {
    Maven,
    Npm,
    Pip,
    Go,
}

impl Ecosystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Maven => "maven",
            Ecosystem::Npm => "npm",
            Ecosystem::Pip => "pip",
            Ecosystem::Go => "go",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency version transition found in a build manifest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyDelta {
    pub file: String,
    pub ecosystem: Ecosystem,
    pub package: String,
    pub from_version: Option<String>,
    pub to_version: Option<String>,
    pub change_type: ChangeType,
}

impl DependencyDelta {
    pub fn locator(&self) -> Locator {
        Locator::path(["dependencies", self.package.as_str()])
    }

    /// The generic delta view used for classification and policy.
    pub fn to_delta(&self) -> Delta {
        Delta::new(
            Category::Dependency,
            self.file.clone(),
            self.locator(),
            self.change_type,
            self.from_version.clone(),
            self.to_version.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_derived_from_file_and_locator() {
        let d = Delta::new(
            Category::Config,
            "application-prod.yml",
            Locator::path(["spring", "datasource", "password"]),
            ChangeType::Modified,
            Some("p1".into()),
            Some("p2".into()),
        );
        assert_eq!(d.id, "cfg~application-prod.yml#spring.datasource.password");
        assert_eq!(d.policy_tag, PolicyTag::None);
        assert!(d.is_counted());
    }

    #[test]
    fn upgrade_never_downgrades() {
        let mut d = Delta::new(
            Category::Config,
            "a.yml",
            Locator::path(["k"]),
            ChangeType::Added,
            None,
            Some("v".into()),
        );
        d.risk_level = RiskLevel::High;
        d.risk_reason = "base".into();

        assert!(!d.upgrade_risk(RiskLevel::Medium, "llm"));
        assert_eq!(d.risk_level, RiskLevel::High);
        assert_eq!(d.risk_reason, "base");

        assert!(d.upgrade_risk(RiskLevel::Critical, "scanner"));
        assert_eq!(d.risk_level, RiskLevel::Critical);
        assert_eq!(d.risk_reason, "base Upgraded to critical: scanner");
    }

    #[test]
    fn risk_level_order_and_parse() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert_eq!("MED".parse::<RiskLevel>().unwrap(), RiskLevel::Medium);
        assert!("severe".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn dependency_delta_projects_to_generic_delta() {
        let dep = DependencyDelta {
            file: "pom.xml".into(),
            ecosystem: Ecosystem::Maven,
            package: "org.slf4j:slf4j-api".into(),
            from_version: Some("1.7.36".into()),
            to_version: Some("2.0.9".into()),
            change_type: ChangeType::Modified,
        };
        let d = dep.to_delta();
        assert_eq!(d.category, Category::Dependency);
        assert_eq!(d.id, r#"dep~pom.xml#dependencies["org.slf4j:slf4j-api"]"#);
        assert_eq!(d.new_value.as_deref(), Some("2.0.9"));
    }

    #[test]
    fn serialized_shape_omits_empty_annotations() {
        let d = Delta::new(
            Category::Dependency,
            "package.json",
            Locator::path(["dependencies", "left-pad"]),
            ChangeType::Added,
            None,
            Some("1.3.0".into()),
        );
        insta::assert_json_snapshot!(d, @r#"
        {
          "id": "dep+package.json#dependencies.left-pad",
          "category": "dependency",
          "file": "package.json",
          "locator": {
            "type": "path_in_tree",
            "segments": [
              "dependencies",
              "left-pad"
            ]
          },
          "change_type": "added",
          "old_value": null,
          "new_value": "1.3.0",
          "risk_level": "low",
          "risk_reason": "",
          "policy_tag": "none"
        }
        "#);
    }
}
