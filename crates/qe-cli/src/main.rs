//! Query engine CLI - serve, introspect, validate and plan against a schema-driven catalog

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{introspect, plan, serve, validate};

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<()> = match &cli.command {
        cli::Commands::Serve(args) => serve::execute(args, &cli.global).await,
        cli::Commands::Introspect(args) => introspect::execute(args).await,
        cli::Commands::Validate(args) => validate::execute(args, &cli.global).await,
        cli::Commands::Plan(args) => plan::execute(args, &cli.global).await,
    };

    if let Err(err) = result {
        // Check if this is an ExitCode (structured exit, not a real error)
        if let Some(exit_code) = err.downcast_ref::<commands::common::ExitCode>() {
            std::process::exit(exit_code.0);
        }
        // Real error — print and exit 1
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
