//! Policy Tagger: allow-list first, then invariants in order, else suspect.

use crate::config::PolicyConfig;
use driftcert_kernel::{Delta, PolicyTag};

/// `policy_rule` recorded for allow-list matches.
pub const ALLOW_RULE: &str = "env_allow_keys";

/// The tag and the rule that produced it.
pub fn evaluate(delta: &Delta, policy: &PolicyConfig) -> (PolicyTag, Option<String>) {
    let locator = delta.locator.match_key();

    if policy
        .env_allow_keys
        .iter()
        .any(|key| locator.contains(key.as_str()))
    {
        return (PolicyTag::AllowedVariance, Some(ALLOW_RULE.to_string()));
    }

    let breached = policy.invariants.iter().find(|inv| {
        locator.contains(&inv.locator_contains.to_lowercase())
            && delta
                .new_value
                .as_ref()
                .is_some_and(|value| inv.forbidden_values.contains(value))
    });
    match breached {
        Some(inv) => (PolicyTag::InvariantBreach, Some(inv.name.clone())),
        None => (PolicyTag::Suspect, None),
    }
}

pub fn tag(delta: &mut Delta, policy: &PolicyConfig) {
    let (tag, rule) = evaluate(delta, policy);
    delta.policy_tag = tag;
    delta.policy_rule = rule;
}

pub fn tag_all(deltas: &mut [Delta], policy: &PolicyConfig) {
    for delta in deltas.iter_mut() {
        tag(delta, policy);
    }
}
