use crate::support::{load_policy_or_exit, print_json_or_exit, print_sample_block};

const SAMPLE_LIMIT: usize = 100;

pub fn run(policy: String, json_output: bool) {
    let loaded = load_policy_or_exit(&policy);

    if json_output {
        print_json_or_exit(&loaded);
        return;
    }

    let config = &loaded.config;
    println!("driftcert policy-check {policy}");
    println!("  Allow keys: {}", config.env_allow_keys.len());
    println!("  Invariants: {}", config.invariants.len());
    println!("  Skipped invariants: {}", loaded.skipped.len());

    let keys: Vec<String> = config.env_allow_keys.iter().cloned().collect();
    print_sample_block("Allow keys", &keys, SAMPLE_LIMIT);

    let invariants: Vec<String> = config
        .invariants
        .iter()
        .map(|inv| {
            let values: Vec<&str> = inv.forbidden_values.iter().map(String::as_str).collect();
            format!(
                "{}: locator contains {:?}, forbidden [{}]",
                inv.name,
                inv.locator_contains,
                values.join(", ")
            )
        })
        .collect();
    print_sample_block("Invariants", &invariants, SAMPLE_LIMIT);

    let skipped: Vec<String> = loaded.skipped.iter().map(ToString::to_string).collect();
    print_sample_block("Skipped", &skipped, SAMPLE_LIMIT);
}
