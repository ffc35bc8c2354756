//! Print UG files to stdout.

use anyhow::Result;
use clap::Parser;
use syndicate_cli::{commands, connect, with_client, GatewayArgs};
use syndicate_config::log_cli_error;

/// Print the contents of files in a Syndicate volume
#[derive(Parser)]
#[command(name = "syndicate-cat", version, about)]
struct Cli {
    #[command(flatten)]
    gateway: GatewayArgs,

    /// Bytes requested per read (defaults to the configured chunk size)
    #[arg(long, value_name = "BYTES")]
    chunk_size: Option<usize>,

    /// Files to print
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    syndicate_cli::init(cli.gateway.verbose);

    let chunk = cli
        .chunk_size
        .unwrap_or_else(|| syndicate_config::config().io.read_chunk_size);
    let client = connect(&cli.gateway, "syndicate-cat")?;
    let stdout = std::io::stdout();
    with_client(client, |c| commands::cat(c, &cli.paths, chunk, &mut stdout.lock())).inspect_err(|e| {
        log_cli_error!("syndicate-cat failed", error = format!("{:#}", e));
    })
}
