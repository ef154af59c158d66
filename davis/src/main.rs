use davis::cli::parse_args;

/// Without arguments, runs the default scenario.
#[tokio::main]
async fn main() {
    println!("davis v{}", env!("CARGO_PKG_VERSION"));
    parse_args().await;
    println!("Done");
}
