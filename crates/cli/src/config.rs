pub use eisen_core::config::*;

use crate::cli::Cli;

pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = AppConfig::discover(cli.data_dir.clone())?;
    Ok(config.with_remote(resolve_remote(cli.api_url.clone(), cli.session.clone())))
}
