//! Show metadata for a UG path.

use anyhow::Result;
use clap::Parser;
use syndicate_cli::{commands, connect, with_client, GatewayArgs};
use syndicate_config::log_cli_error;

/// Show a file's metadata, or a directory's metadata and entries
#[derive(Parser)]
#[command(name = "syndicate-ls", version, about)]
struct Cli {
    #[command(flatten)]
    gateway: GatewayArgs,

    /// File or directory to describe
    #[arg(value_name = "PATH")]
    path: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    syndicate_cli::init(cli.gateway.verbose);

    let client = connect(&cli.gateway, "syndicate-ls")?;
    let stdout = std::io::stdout();
    with_client(client, |c| commands::ls(c, &cli.path, &mut stdout.lock())).inspect_err(|e| {
        log_cli_error!("syndicate-ls failed", error = format!("{:#}", e));
    })
}
