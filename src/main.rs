use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = eisen::cli::Cli::parse();
    eisen::init_tracing(cli.log_filter.clone())?;

    let config = eisen::config::from_cli(&cli)?;
    let command = cli.command.clone().unwrap_or(eisen::cli::CliCommand::Board);
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    eisen::commands::execute(&config, command, &mut handle)?;

    Ok(())
}
