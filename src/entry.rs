use clap::Parser;

use crate::app;
use crate::args::{Cli, Command};
use crate::config::load_config;
use crate::error::AppResult;

/// Parses the command line, sets up logging and the runtime, and runs the
/// selected subcommand to completion.
///
/// # Errors
///
/// Returns an error when configuration, setup, or the subcommand fails.
pub fn run() -> AppResult<()> {
    let cli = Cli::parse();
    crate::logger::init_logging(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(cli))
}

async fn run_async(cli: Cli) -> AppResult<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Serve(args) => app::serve(&args, config.as_ref()).await,
        Command::Run(args) => app::run_once(&args, config.as_ref()).await,
        Command::History(args) => app::show_history(&args, config.as_ref()).await,
    }
}
