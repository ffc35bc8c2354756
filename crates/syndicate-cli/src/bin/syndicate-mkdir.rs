//! Create UG directories.

use anyhow::Result;
use clap::Parser;
use syndicate_cli::{commands, connect, with_client, GatewayArgs};
use syndicate_config::log_cli_error;

/// Create directories in a Syndicate volume (mode 0777 minus the umask)
#[derive(Parser)]
#[command(name = "syndicate-mkdir", version, about)]
struct Cli {
    #[command(flatten)]
    gateway: GatewayArgs,

    /// Directories to create, in order
    #[arg(value_name = "DIR", required = true)]
    dirs: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    syndicate_cli::init(cli.gateway.verbose);

    let client = connect(&cli.gateway, "syndicate-mkdir")?;
    with_client(client, |c| commands::mkdir(c, &cli.dirs)).inspect_err(|e| {
        log_cli_error!("syndicate-mkdir failed", error = format!("{:#}", e));
    })
}
