//! Entrypoint for CLI

use clap::Parser;
mod cli;
mod driver;
mod frontend;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = cli::Cli::parse();
    cli.execute()?;
    Ok(())
}
