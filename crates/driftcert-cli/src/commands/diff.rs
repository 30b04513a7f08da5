use crate::support::{
    load_context_or_exit, load_policy_or_exit, load_snapshot_or_exit, parse_environment_or_exit,
    print_json_or_exit, print_sample_block,
};
use driftcert_certify::{Decision, run_engine};

const DELTA_SAMPLE_LIMIT: usize = 50;

pub struct Args {
    pub golden: String,
    pub candidate: String,
    pub policy: String,
    pub context: Option<String>,
    pub environment: Option<String>,
    pub json: bool,
    pub enforce: bool,
}

pub fn run(args: Args) {
    let loaded = load_policy_or_exit(&args.policy);
    for skipped in &loaded.skipped {
        eprintln!("warning: {skipped}; invariant skipped");
    }
    let mut context = load_context_or_exit(args.context.as_deref());
    if let Some(env) = &args.environment {
        context.environment = parse_environment_or_exit(env);
    }
    let golden = load_snapshot_or_exit(&args.golden, "golden");
    let candidate = load_snapshot_or_exit(&args.candidate, "candidate");
    tracing::debug!(
        golden_files = golden.len(),
        candidate_files = candidate.len(),
        environment = %context.environment,
        "snapshots loaded"
    );

    let output = run_engine(&golden, &candidate, Some(&loaded.config), &context)
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            std::process::exit(1);
        });

    if args.json {
        print_json_or_exit(&output);
    } else {
        let score = &output.score;
        let summary = &output.summary;
        let counts = &summary.risk_counts;
        println!("driftcert diff {} -> {}", args.golden, args.candidate);
        println!("  Environment: {}", context.environment);
        println!(
            "  Decision: {} (score {}/100, confidence {})",
            score.decision,
            score.score,
            score.confidence_level.as_str()
        );
        println!("  Rule: {}", score.decision_rule);
        println!(
            "  Files: +{} -{} ~{} >{} (unparseable {})",
            summary.files_added,
            summary.files_removed,
            summary.files_modified,
            summary.files_renamed,
            summary.files_unparseable
        );
        println!(
            "  Deltas: {} (critical {}, high {}, medium {}, low {}, allowed {})",
            summary.total_deltas,
            counts.critical,
            counts.high,
            counts.medium,
            counts.low,
            counts.allowed_variance
        );
        println!("  Digest: {}", output.digest);

        let deltas: Vec<String> = output
            .deltas
            .iter()
            .map(|d| {
                let line = d.line_hint.map(|l| format!(":{l}")).unwrap_or_default();
                format!(
                    "[{}] {}{line} ({}) {}",
                    d.risk_level, d.id, d.policy_tag, d.risk_reason
                )
            })
            .collect();
        print_sample_block("Deltas", &deltas, DELTA_SAMPLE_LIMIT);

        let unparseable: Vec<String> = output
            .unparseable
            .iter()
            .map(|u| format!("{} ({}): {}", u.path, u.side, u.reason))
            .collect();
        print_sample_block("Unparseable", &unparseable, DELTA_SAMPLE_LIMIT);
        println!("  {}", score.explanation);
    }

    if args.enforce && output.score.decision == Decision::BlockMerge {
        std::process::exit(2);
    }
}
