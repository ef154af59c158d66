//! Parses the command line arguments for the scenario runner.
//!
//! Basic usage, with tracing turned on:
//!
//! ```text
//! cargo run -- --scenario bellman-ford --log
//! ```

use crate::simulations;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Stores the different command line arguments.
#[derive(Parser)]
struct Args {
    /// Logging flag. Used to turn diagnostic tracing on or off.
    #[arg(short, long)]
    log: bool,
    /// Which scenario to run.
    #[arg(short, long, default_value = "bellman-ford")]
    scenario: String,
}

/// Parses the command line arguments and runs the chosen scenario.
pub async fn parse_args() {
    let cli = Args::parse();
    if cli.log {
        initialize_logging();
    }
    match cli.scenario.as_str() {
        "bellman-ford" => simulations::bellman_ford().await,
        "direct-conversation" => simulations::direct_conversation().await,
        "random-traffic" => simulations::random_traffic().await,
        other => eprintln!(
            "unknown scenario '{}' (expected bellman-ford, direct-conversation, or random-traffic)",
            other
        ),
    }
}

/// Sends every diagnostic event to stderr. Only call once per process.
fn initialize_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");
}
