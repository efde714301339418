mod cmd;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// fragcrypt: encrypt files with Shamir secret sharing.
///
/// The password is hashed and split into N shares (BASE.frg); any T of them
/// recover the key for the encrypted document (BASE.aes). Fewer reveal nothing.
///
/// Crypto: SHA-256 (password → secret → key) + AES-256-ECB (no IV, no MAC).
/// Shares: Shamir over a 257-bit prime field, decimal `(x, y)` lines.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug detail to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: cmd::Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("fragcrypt=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "fragcrypt=warn".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    cmd::run(cli.command)
}
