use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "driftcert",
    about = "Driftcert: drift detection and confidence scoring for golden vs candidate config trees",
    version
)]
pub struct Cli {
    /// Log debug events to stderr (RUST_LOG overrides)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Diff two config trees, classify every delta, and certify the change
    Diff {
        /// Golden (baseline) tree root
        #[arg(long)]
        golden: String,

        /// Candidate tree root
        #[arg(long)]
        candidate: String,

        /// Policy document (.toml, .yml or .yaml)
        #[arg(long)]
        policy: String,

        /// Run context JSON (blast radius, history, judgments, ...)
        #[arg(long)]
        context: Option<String>,

        /// Target environment; overrides the run context's
        #[arg(long)]
        environment: Option<String>,

        /// Output the full engine output as JSON
        #[arg(long)]
        json: bool,

        /// Exit with status 2 when the decision is BLOCK_MERGE
        #[arg(long)]
        enforce: bool,
    },

    /// Score precomputed risk counts and violations
    Score {
        /// Score request JSON: risk_counts, policy_violations, context
        #[arg(long)]
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load and validate a policy document
    PolicyCheck {
        /// Policy document (.toml, .yml or .yaml)
        #[arg(long)]
        policy: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
