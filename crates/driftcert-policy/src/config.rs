//! Policy configuration: the allow-list and the invariants.
//!
//! A policy document is TOML or YAML:
//!
//! ```toml
//! env_allow_keys = ["environment", "logging.level"]
//!
//! [[invariants]]
//! name = "no-debug-in-prod"
//! locator_contains = "debug"
//! forbid_values = ["true"]
//! ```
//!
//! Invariants with an unusable locator pattern are reported as
//! [`InvariantConfigError`]s and skipped; loading still succeeds.

use crate::error::{InvariantConfigError, PolicyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// A hard constraint: a locator pattern and the values it must never take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invariant {
    pub name: String,
    pub locator_contains: String,
    pub forbidden_values: BTreeSet<String>,
}

impl Invariant {
    pub fn new<I, S>(name: &str, locator_contains: &str, forbidden_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            locator_contains: locator_contains.to_string(),
            forbidden_values: forbidden_values.into_iter().map(Into::into).collect(),
        }
    }

    fn pattern_error(&self) -> Option<InvariantConfigError> {
        let pattern = &self.locator_contains;
        (pattern.is_empty() || pattern.chars().any(char::is_whitespace)).then(|| {
            InvariantConfigError {
                name: self.name.clone(),
                pattern: pattern.clone(),
            }
        })
    }
}

/// Loaded once per run; immutable during it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Lowercase locator substrings marking expected environment variance.
    pub env_allow_keys: BTreeSet<String>,
    /// Checked in order; the first breached invariant names the breach.
    pub invariants: Vec<Invariant>,
}

/// A policy plus the invariants dropped while loading it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadedPolicy {
    pub config: PolicyConfig,
    pub skipped: Vec<InvariantConfigError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PolicyDocument {
    env_allow_keys: Vec<String>,
    invariants: Vec<InvariantDocument>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InvariantDocument {
    name: Option<String>,
    locator_contains: String,
    #[serde(alias = "forbid_values")]
    forbidden_values: Vec<ScalarValue>,
}

/// A forbidden value as written. Any scalar is accepted and compared by
/// its string form, so `0`, `"0"`, `true` and `"true"` all work.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScalarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<ScalarValue> for String {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Float(f) => f.to_string(),
            ScalarValue::Text(s) => s,
        }
    }
}

impl PolicyConfig {
    /// Build a policy, dropping invalid invariants.
    pub fn new<I, S>(env_allow_keys: I, invariants: Vec<Invariant>) -> LoadedPolicy
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = PolicyConfig {
            env_allow_keys: env_allow_keys
                .into_iter()
                .map(|key| key.as_ref().trim().to_lowercase())
                .filter(|key| !key.is_empty())
                .collect(),
            invariants: Vec::with_capacity(invariants.len()),
        };
        let mut skipped = Vec::new();
        for invariant in invariants {
            match invariant.pattern_error() {
                Some(err) => {
                    tracing::warn!(invariant = %err.name, pattern = %err.pattern, "skipping invariant");
                    skipped.push(err);
                }
                None => config.invariants.push(invariant),
            }
        }
        LoadedPolicy { config, skipped }
    }

    pub fn from_toml_str(text: &str) -> Result<LoadedPolicy, PolicyError> {
        let doc: PolicyDocument = toml::from_str(text)?;
        Ok(Self::from_document(doc))
    }

    pub fn from_yaml_str(text: &str) -> Result<LoadedPolicy, PolicyError> {
        if text.trim().is_empty() {
            return Ok(Self::from_document(PolicyDocument::default()));
        }
        let doc: PolicyDocument = serde_yaml::from_str(text)?;
        Ok(Self::from_document(doc))
    }

    /// Load a policy document, choosing the parser by file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<LoadedPolicy, PolicyError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let read = || {
            std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
                path: path.to_path_buf(),
                source,
            })
        };
        match ext.as_str() {
            "toml" => Self::from_toml_str(&read()?),
            "yml" | "yaml" => Self::from_yaml_str(&read()?),
            _ => Err(PolicyError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Invariant errors in an already-built config.
    pub fn validate(&self) -> Vec<InvariantConfigError> {
        self.invariants
            .iter()
            .filter_map(Invariant::pattern_error)
            .collect()
    }

    fn from_document(doc: PolicyDocument) -> LoadedPolicy {
        let invariants = doc
            .invariants
            .into_iter()
            .enumerate()
            .map(|(idx, inv)| Invariant {
                name: inv
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("invariant-{}", idx + 1)),
                locator_contains: inv.locator_contains,
                forbidden_values: inv.forbidden_values.into_iter().map(String::from).collect(),
            })
            .collect();
        let loaded = Self::new(doc.env_allow_keys, invariants);
        tracing::debug!(
            allow_keys = loaded.config.env_allow_keys.len(),
            invariants = loaded.config.invariants.len(),
            skipped = loaded.skipped.len(),
            "policy loaded"
        );
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_POLICY: &str = r#"
env_allow_keys = ["Environment", "logging.level"]

[[invariants]]
name = "no-debug"
locator_contains = "debug"
forbid_values = ["true"]

[[invariants]]
locator_contains = "ssl.enabled"
forbidden_values = ["false"]

[[invariants]]
name = "broken"
locator_contains = "server port"
forbid_values = ["0"]
"#;

    #[test]
    fn toml_policy_loads_and_skips_bad_invariants() {
        let loaded = PolicyConfig::from_toml_str(TOML_POLICY).unwrap();
        insta::assert_json_snapshot!(loaded, @r#"
        {
          "config": {
            "env_allow_keys": [
              "environment",
              "logging.level"
            ],
            "invariants": [
              {
                "name": "no-debug",
                "locator_contains": "debug",
                "forbidden_values": [
                  "true"
                ]
              },
              {
                "name": "invariant-2",
                "locator_contains": "ssl.enabled",
                "forbidden_values": [
                  "false"
                ]
              }
            ]
          },
          "skipped": [
            {
              "name": "broken",
              "pattern": "server port"
            }
          ]
        }
        "#);
    }

    #[test]
    fn yaml_policy_accepts_both_value_spellings() {
        let text = "env_allow_keys: [environment]\ninvariants:\n  - name: a\n    locator_contains: x\n    forbid_values: ['1']\n  - name: b\n    locator_contains: y\n    forbidden_values: ['2']\n";
        let loaded = PolicyConfig::from_yaml_str(text).unwrap();
        assert!(loaded.skipped.is_empty());
        let values: Vec<Vec<&str>> = loaded
            .config
            .invariants
            .iter()
            .map(|i| i.forbidden_values.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(values, vec![vec!["1"], vec!["2"]]);
    }

    fn forbidden(loaded: &LoadedPolicy) -> Vec<&str> {
        loaded.config.invariants[0]
            .forbidden_values
            .iter()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn toml_forbidden_values_may_be_any_scalar() {
        let text = "[[invariants]]\nlocator_contains = \"port\"\nforbid_values = [0, true, 1.5, \"off\"]\n";
        let loaded = PolicyConfig::from_toml_str(text).unwrap();
        assert_eq!(forbidden(&loaded), ["0", "1.5", "off", "true"]);
    }

    #[test]
    fn yaml_forbidden_values_may_be_any_scalar() {
        let text = "invariants:\n  - locator_contains: debug\n    forbid_values: [true, 0, 'false']\n";
        let loaded = PolicyConfig::from_yaml_str(text).unwrap();
        assert_eq!(forbidden(&loaded), ["0", "false", "true"]);
    }

    #[test]
    fn empty_documents_are_empty_policies() {
        assert_eq!(
            PolicyConfig::from_yaml_str("").unwrap().config,
            PolicyConfig::default()
        );
        assert_eq!(
            PolicyConfig::from_toml_str("").unwrap().config,
            PolicyConfig::default()
        );
    }

    #[test]
    fn empty_pattern_is_an_invariant_error() {
        let loaded = PolicyConfig::new(["x"], vec![Invariant::new("empty", "", ["v"])]);
        assert!(loaded.config.invariants.is_empty());
        assert_eq!(loaded.skipped[0].name, "empty");
        assert_eq!(
            loaded.skipped[0].to_string(),
            "invariant config error in empty: unknown locator pattern \"\""
        );
    }

    #[test]
    fn validate_reports_hand_built_invariants() {
        let config = PolicyConfig {
            env_allow_keys: BTreeSet::new(),
            invariants: vec![Invariant::new("ok", "a", ["1"]), Invariant::new("bad", "a b", ["1"])],
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "bad");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = PolicyConfig::load("policy.ini").unwrap_err();
        assert!(matches!(err, PolicyError::UnsupportedFormat(_)));
    }
}
