//! Connect to a gateway and guarantee shutdown.

use anyhow::{Context, Result};
use syndicate_config::{log_cli_error, log_cli_info, log_loader_error, Config};
use syndicate_ug::{Client, UgApi};

use crate::args::GatewayArgs;

/// Load the native stack and start a gateway from `args` plus config.
pub fn connect(args: &GatewayArgs, program: &str) -> Result<Client> {
    let config = syndicate_config::config().clone();
    let paths = args.library_paths(&config);
    let opts = args.init_options(&config, program);
    log_cli_info!("starting gateway", user = opts.user.as_str(), volume = opts.volume.as_str());
    match Client::load(&paths, &opts) {
        Ok(client) => Ok(configure(client, &config)),
        Err(e) => {
            log_loader_error!("gateway start failed", library = paths.ug.display().to_string(), error = e.to_string());
            Err(e).with_context(|| format!("Failed to start the gateway ({})", paths.ug.display()))
        }
    }
}

/// Apply the `[io]` settings that live on the client rather than in init.
pub fn configure<A: UgApi>(client: Client<A>, config: &Config) -> Client<A> {
    client.with_readdir_batch(config.io.readdir_batch)
}

/// Run `f` with `client`, then shut the client down whatever `f` returned.
///
/// An error from `f` takes precedence over a shutdown error.
pub fn with_client<A, T, F>(client: Client<A>, f: F) -> Result<T>
where
    A: UgApi,
    F: FnOnce(&Client<A>) -> Result<T>,
{
    let result = f(&client);
    let shutdown = client.shutdown().context("Failed to shut down the gateway");
    match (result, shutdown) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(shutdown_err)) => {
            log_cli_error!("shutdown after failure also failed", error = format!("{:#}", shutdown_err));
            Err(e)
        }
    }
}
