//! Media Range Cache CLI application
//!
//! Command-line interface for fetching byte ranges of remote media through
//! a persistent disk cache, prefetching, and cache maintenance.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use media_range_cache::cli::{
    handle_cache, handle_fetch, handle_plan, handle_prefetch, Cli, Commands,
};
use media_range_cache::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(&cli);

    info!("Media Range Cache v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(&cli.global, args).await
        }
        Commands::Prefetch(args) => {
            info!("Executing prefetch command");
            handle_prefetch(&cli.global, args).await
        }
        Commands::Plan(args) => {
            info!("Executing plan command");
            handle_plan(&cli.global, args).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(&cli.global, args).await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let mut filter = EnvFilter::from_default_env();
    match format!("media_range_cache={}", log_level).parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Invalid log directive: {}", e),
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
