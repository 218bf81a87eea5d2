//! Curator CLI: extract collection content from markdown directories or
//! spreadsheets, build a graph model, and publish it as a graph file or a
//! static site.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = commands::resolve_config(&cli)?;
    commands::init_tracing(&cli.log_format, cli.verbose, config.debug);
    commands::run(&config)
}
