use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use token_indexer::{Config, IndexResult, TokenIndexer, TokenSource};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "token-indexer")]
#[command(about = "List the fungible tokens held by an Ethereum, Solana or Tron address", long_about = None)]
struct Args {
    /// The wallet address to index. The chain is detected from its prefix.
    #[arg(short, long)]
    address: String,

    /// Read endpoints from this JSON file instead of the built-in configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the per-request timeout
    #[arg(short, long)]
    timeout_secs: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Log every upstream request
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn describe(source: &TokenSource) -> String {
    match source {
        TokenSource::Live { provider } => format!("live ({provider})"),
        TokenSource::Synthetic => "synthetic demonstration data".to_string(),
        TokenSource::Diagnostic => "unavailable".to_string(),
        TokenSource::Failed { reason } => format!("failed: {reason}"),
        TokenSource::Cancelled => "cancelled".to_string(),
    }
}

fn print_table(result: &IndexResult) {
    println!("Chain:  {}", result.chain);
    println!("Source: {}", describe(&result.source));
    println!("{}", "=".repeat(72));

    let tokens = result.tokens();
    if tokens.is_empty() {
        println!("No tokens found");
    }
    for token in tokens {
        match &token.error {
            Some(error) => println!("{:10} | {}", token.symbol, error),
            None => println!(
                "{:10} | {:>20} | {}",
                token.symbol,
                token.balance,
                token.mint.as_deref().unwrap_or(&token.name)
            ),
        }
    }

    println!("{}", "=".repeat(72));
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(secs) = args.timeout_secs {
        anyhow::ensure!(secs > 0, "--timeout-secs must be greater than zero");
        config.request_timeout_secs = secs;
    }

    let indexer = TokenIndexer::from_config(&config)?;
    let address = args.address.trim();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling lookup");
            on_interrupt.cancel();
        }
    });

    let result = indexer.index_tokens_with_cancel(address, &cancel).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Indexing tokens for address: {}\n", address);
        print_table(&result);
    }

    if result.source == TokenSource::Cancelled {
        std::process::exit(130);
    }

    Ok(())
}
