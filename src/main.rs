use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use image_gateway::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    init_tracing(&config::resolve_log_level(
        args.log_level.as_deref(),
        &args.config,
    ));

    match args.get_command() {
        cli::Commands::Start => {
            commands::start::execute(&args.config).await?;
        }
        cli::Commands::Test => {
            commands::test::execute(&args.config)?;
        }
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
        },
        cli::Commands::Version => {
            println!("Image Gateway v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
