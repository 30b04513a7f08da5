//! End-to-end certification scenarios.
//!
//! Each test builds golden and candidate snapshots in memory, runs the full
//! engine, and checks risk, policy tags, score and decision.

use driftcert_certify::{
    BlastRadiusInfo, ChangeContext, Decision, Environment, EvidenceInfo, ImpactScope,
    LlmSafetyInput, PolicyViolation, RiskCounts, RunContext, ScoreRequest, run_engine, score,
    score_run,
};
use driftcert_kernel::{PolicyTag, RiskLevel, Snapshot};
use driftcert_policy::{GuardrailFlags, Invariant, PolicyConfig};
use std::collections::BTreeMap;

fn snapshot(files: &[(&str, &str)]) -> Snapshot {
    let mut snap = Snapshot::new();
    for (path, text) in files {
        snap.insert_text(path, text);
    }
    snap
}

fn no_policy() -> PolicyConfig {
    PolicyConfig::default()
}

#[test]
fn prod_password_change_blocks_in_every_environment() {
    let golden = snapshot(&[(
        "application-prod.yml",
        "spring:\n  datasource:\n    password: p1\n",
    )]);
    let candidate = snapshot(&[(
        "application-prod.yml",
        "spring:\n  datasource:\n    password: p2\n",
    )]);

    for env in [Environment::Production, Environment::Staging, Environment::Development] {
        let out = run_engine(
            &golden,
            &candidate,
            Some(&no_policy()),
            &RunContext::for_environment(env),
        )
        .unwrap();
        assert_eq!(out.deltas.len(), 1);
        let delta = &out.deltas[0];
        assert_eq!(delta.id, "cfg~application-prod.yml#spring.datasource.password");
        assert_eq!(delta.risk_level, RiskLevel::High);
        assert_eq!(delta.policy_tag, PolicyTag::Suspect);
        assert_eq!(out.summary.risk_counts.high, 1);
        assert_eq!(out.score.component_breakdown["risk_deduction"], -60);
        assert_eq!(out.score.decision, Decision::BlockMerge);
        assert!(out.score.decision_rule.starts_with("CRITICAL RULE"));
    }
}

#[test]
fn allowed_environment_name_auto_merges_in_staging() {
    let golden = snapshot(&[("settings.yml", "environment:\n  name: prod\n")]);
    let candidate = snapshot(&[("settings.yml", "environment:\n  name: staging\n")]);
    let policy = PolicyConfig::new(["environment"], vec![]).config;

    let out = run_engine(
        &golden,
        &candidate,
        Some(&policy),
        &RunContext::for_environment(Environment::Staging),
    )
    .unwrap();
    assert_eq!(out.deltas[0].policy_tag, PolicyTag::AllowedVariance);
    assert_eq!(out.summary.risk_counts, RiskCounts {
        allowed_variance: 1,
        ..RiskCounts::default()
    });
    assert_eq!(out.score.score, 100);
    assert_eq!(out.score.decision, Decision::AutoMerge);
}

#[test]
fn allowed_variance_never_counts_even_when_critical() {
    let golden = snapshot(&[("settings.yml", "environment:\n  secret: a\n")]);
    let candidate = snapshot(&[("settings.yml", "environment:\n  secret: b\n")]);
    let policy = PolicyConfig::new(["environment"], vec![]).config;
    let id = "cfg~settings.yml#environment.secret".to_string();
    let context = RunContext {
        guardrail_flags: BTreeMap::from([(
            id,
            GuardrailFlags {
                secret_detected: true,
                malicious_severity: Some(RiskLevel::Critical),
            },
        )]),
        ..RunContext::default()
    };

    let out = run_engine(&golden, &candidate, Some(&policy), &context).unwrap();
    assert_eq!(out.deltas[0].risk_level, RiskLevel::Critical);
    assert_eq!(out.deltas[0].policy_tag, PolicyTag::AllowedVariance);
    assert_eq!(out.summary.risk_counts.critical, 0);
    assert_eq!(out.summary.risk_counts.allowed_variance, 1);
    assert_eq!(out.score.decision, Decision::AutoMerge);
}

#[test]
fn thirty_low_deltas_block_in_production_without_the_override() {
    let counts = RiskCounts {
        low: 30,
        ..RiskCounts::default()
    };
    let result = score_run(&counts, &[], &RunContext::for_environment(Environment::Production));
    assert_eq!(result.component_breakdown["risk_deduction"], -60);
    assert_eq!(result.score, 40);
    assert_eq!(result.decision, Decision::BlockMerge);
    assert_eq!(result.decision_rule, "production threshold: score 40 below 60");
}

#[test]
fn one_medium_delta_blocks_even_at_full_score() {
    // Bonuses push the raw sum well past 100 despite the -55.
    let context = RunContext {
        environment: Environment::Development,
        llm_safety: Some(LlmSafetyInput {
            safety_probability: 0.99,
            anomaly_score: 0.0,
        }),
        change: Some(ChangeContext {
            has_tags: true,
            has_issue_link: true,
            has_rollback_plan: true,
            has_test_evidence: true,
            description_quality: driftcert_certify::DescriptionQuality::High,
        }),
        evidence: Some(EvidenceInfo {
            found: vec!["tests".into(), "approval".into()],
            missing: vec![],
        }),
        ..RunContext::default()
    };
    let counts = RiskCounts {
        medium: 1,
        ..RiskCounts::default()
    };
    let result = score_run(&counts, &[], &context);
    assert_eq!(result.score, 100);
    assert_eq!(result.decision, Decision::BlockMerge);
}

#[test]
fn score_is_clamped_at_zero() {
    let violations: Vec<PolicyViolation> = (0..5)
        .map(|i| PolicyViolation {
            delta_id: Some(format!("d{i}")),
            rule: "no-debug".into(),
            severity: RiskLevel::Critical,
        })
        .collect();
    let context = RunContext {
        blast_radius: Some(BlastRadiusInfo {
            files_affected: 50,
            critical_files: 10,
            downstream_services: vec![],
            scope: ImpactScope::Critical,
        }),
        ..RunContext::default()
    };
    let counts = RiskCounts {
        critical: 2,
        ..RiskCounts::default()
    };
    let result = score_run(&counts, &violations, &context);
    assert_eq!(result.component_breakdown["policy_deduction"], -150);
    assert_eq!(result.score, 0);
    assert_eq!(result.decision, Decision::BlockMerge);
}

#[test]
fn score_breakdown_snapshot() {
    let context = RunContext {
        environment: Environment::Staging,
        blast_radius: Some(BlastRadiusInfo {
            files_affected: 4,
            critical_files: 0,
            downstream_services: vec!["orders".into()],
            scope: ImpactScope::Low,
        }),
        change: Some(ChangeContext {
            has_rollback_plan: true,
            ..ChangeContext::default()
        }),
        ..RunContext::default()
    };
    let request = ScoreRequest {
        risk_counts: Some(RiskCounts {
            low: 3,
            ..RiskCounts::default()
        }),
        policy_violations: vec![],
        context,
    };
    let result = score(&request).unwrap();
    insta::assert_json_snapshot!(result.component_breakdown, @r#"
    {
      "base": 100,
      "blast_radius_penalty": -13,
      "context_bonus": 10,
      "evidence_adjustment": 0,
      "history_adjustment": 0,
      "llm_safety_adjustment": 0,
      "policy_deduction": 0,
      "risk_deduction": -6
    }
    "#);
    assert_eq!(result.score, 91);
    assert_eq!(result.decision, Decision::AutoMerge);
}

#[test]
fn rename_is_one_low_file_delta() {
    let golden = snapshot(&[("a.yml", "k: v\n")]);
    let candidate = snapshot(&[("b.yml", "k: v\n")]);
    let out = run_engine(&golden, &candidate, Some(&no_policy()), &RunContext::default()).unwrap();

    assert!(out.structural.added.is_empty());
    assert!(out.structural.removed.is_empty());
    assert_eq!(out.structural.renamed.len(), 1);
    assert_eq!(out.structural.renamed[0].from, "a.yml");
    assert_eq!(out.structural.renamed[0].to, "b.yml");
    assert_eq!(out.deltas.len(), 1);
    assert_eq!(out.deltas[0].risk_level, RiskLevel::Low);
    // 100 - 2 for one low delta.
    assert_eq!(out.score.score, 98);
    assert_eq!(out.score.decision, Decision::AutoMerge);
}

#[test]
fn invariant_breach_is_a_violation_and_sticks() {
    let golden = snapshot(&[("app.yml", "feature:\n  debug: false\n")]);
    let candidate = snapshot(&[("app.yml", "feature:\n  debug: true\n")]);
    let policy = PolicyConfig::new(
        Vec::<String>::new(),
        vec![Invariant::new("no-debug", "debug", ["true"])],
    )
    .config;
    let out = run_engine(&golden, &candidate, Some(&policy), &RunContext::default()).unwrap();

    let delta = &out.deltas[0];
    assert_eq!(delta.policy_tag, PolicyTag::InvariantBreach);
    assert_eq!(delta.policy_rule.as_deref(), Some("no-debug"));
    // medium baseline, violation counted at high
    assert_eq!(out.score.component_breakdown["policy_deduction"], -15);
    assert_eq!(out.score.component_breakdown["risk_deduction"], -55);
    assert_eq!(out.score.decision, Decision::BlockMerge);
}

#[test]
fn identical_inputs_give_identical_output() {
    let golden = snapshot(&[
        ("application-prod.yml", "server:\n  port: 8080\n"),
        ("Dockerfile", "FROM eclipse-temurin:17\n"),
        ("run.sh", "#!/bin/sh\njava -jar app.jar\n"),
        ("old.yml", "a: 1\n"),
    ]);
    let candidate = snapshot(&[
        ("application-prod.yml", "server:\n  port: 9090\n"),
        ("Dockerfile", "FROM eclipse-temurin:21\n"),
        ("run.sh", "#!/bin/sh\njava -Xmx1g -jar app.jar\n"),
        ("new.yml", "a: 1\n"),
    ]);
    let policy = PolicyConfig::new(["logging"], vec![Invariant::new("x", "port", ["0"])]).config;
    let context: RunContext = serde_json::from_str(
        r#"{"environment": "stage", "history": {"past_successes": 3, "trust_level": 0.9}}"#,
    )
    .unwrap();

    let first = run_engine(&golden, &candidate, Some(&policy), &context).unwrap();
    let second = run_engine(&golden, &candidate, Some(&policy), &context).unwrap();
    assert_eq!(first.digest, second.digest);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.structural.renamed.len(), 1);
}

#[test]
fn corrupted_config_is_never_auto_merged() {
    let golden = snapshot(&[("application-prod.yml", "db:\n  password: a\n")]);
    let candidate = snapshot(&[("application-prod.yml", "db:\n  password: [unclosed\n")]);

    let out = run_engine(&golden, &candidate, Some(&no_policy()), &RunContext::default()).unwrap();
    assert_eq!(out.unparseable.len(), 1);
    assert_eq!(out.summary.files_unparseable, 1);
    assert!(!out.deltas.is_empty());
    assert!(out.deltas.iter().all(|d| d.file == "application-prod.yml"));
    assert!(out.summary.risk_counts.medium + out.summary.risk_counts.high >= 1);
    assert_ne!(out.score.decision, Decision::AutoMerge);
}

#[test]
fn score_request_without_counts_is_incomplete() {
    let request: ScoreRequest = serde_json::from_str(r#"{"context": {}}"#).unwrap();
    let err = score(&request).unwrap_err();
    assert_eq!(err.to_string(), "incomplete input: risk_counts");
}
