use crate::support::{print_json_or_exit, read_json_or_exit};
use driftcert_certify::{ScoreRequest, score};

pub fn run(input: String, json_output: bool) {
    let request: ScoreRequest = read_json_or_exit(&input, "score request");
    let result = score(&request).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        std::process::exit(1);
    });

    if json_output {
        print_json_or_exit(&result);
    } else {
        println!("driftcert score {input}");
        println!("  Environment: {}", request.context.environment);
        println!(
            "  Decision: {} (score {}/100, confidence {})",
            result.decision,
            result.score,
            result.confidence_level.as_str()
        );
        println!("  Rule: {}", result.decision_rule);
        println!("  Components:");
        for (name, value) in &result.component_breakdown {
            println!("    {name}: {value:+}");
        }
        println!("  {}", result.explanation);
    }
}
