use std::io;

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Context;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(io::stderr)
        .init();

    let ctx = Context::new(clawapi_core::Config::load()?);
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Available => commands::available(&ctx, &mut out)?,
        Commands::List => commands::list(&ctx, &mut out)?,
        Commands::Add { provider } => commands::add(&ctx, &provider, &mut out)?,
        Commands::Rm { provider, purge } => commands::remove(&ctx, &provider, purge, &mut out)?,
        Commands::Status => commands::status(&ctx, &mut out).await?,
        Commands::Reset { provider } => commands::reset(&ctx, &provider, &mut out)?,
        Commands::Export { provider, output } => {
            commands::export(&ctx, &provider, output, &mut out)?
        }
        Commands::Import { provider, archive } => {
            commands::import(&ctx, &provider, &archive, &mut out)?
        }
        Commands::Test { model, prompt } => {
            commands::test(&ctx, &model, &prompt, &mut out).await?
        }
    }
    Ok(())
}
