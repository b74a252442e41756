use clap::Parser;

/// Run a simulated device fleet against a shared pool of test work.
///
/// The plan file describes the workers (serials, tokens, scripted faults)
/// and the work items; the accounting is printed as JSON on stdout.
#[derive(Parser, Debug)]
#[command(name = "lanepool", about = "Shared test-pool scheduler harness")]
pub struct CliArgs {
    /// Path to the TOML run plan
    #[arg(long, env = "LANEPOOL_PLAN")]
    pub plan: String,

    /// Path to a scheduler config file (defaults plus LANEPOOL_* env when unset)
    #[arg(long, env = "LANEPOOL_CONFIG")]
    pub config: Option<String>,

    /// Print the summary as compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}
