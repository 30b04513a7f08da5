use driftcert_certify::{Environment, RunContext};
use driftcert_kernel::Snapshot;
use driftcert_policy::{LoadedPolicy, PolicyConfig};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

pub fn load_policy_or_exit(path: &str) -> LoadedPolicy {
    PolicyConfig::load(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load policy {path}: {e}");
        std::process::exit(1);
    })
}

pub fn load_snapshot_or_exit(path: &str, label: &str) -> Snapshot {
    if !Path::new(path).is_dir() {
        eprintln!("error: {label} tree is not a directory: {path}");
        std::process::exit(1);
    }
    Snapshot::from_dir(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read {label} tree {path}: {e}");
        std::process::exit(1);
    })
}

pub fn read_json_or_exit<T: DeserializeOwned>(path: &str, label: &str) -> T {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("error: failed to read {label} {path}: {e}");
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("error: invalid {label} {path}: {e}");
        std::process::exit(1);
    })
}

pub fn load_context_or_exit(path: Option<&str>) -> RunContext {
    path.map(|p| read_json_or_exit(p, "run context"))
        .unwrap_or_default()
}

pub fn parse_environment_or_exit(env: &str) -> Environment {
    env.parse().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    })
}

pub fn print_json_or_exit<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: json serialization failed: {e}");
            std::process::exit(1);
        }
    }
}

pub fn print_sample_block(header: &str, items: &[String], limit: usize) {
    if items.is_empty() {
        return;
    }

    println!("  {header}:");
    for item in items.iter().take(limit) {
        println!("    - {item}");
    }
    if items.len() > limit {
        println!("    - ... and {} more", items.len() - limit);
    }
}
