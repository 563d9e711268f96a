use clap::Parser;
use cli::{Cli, Commands};
use style::{CROSS, RED};
use tracing_subscriber::EnvFilter;

mod apply;
mod cli;
mod hosts;
mod progress;
mod status;
mod style;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Apply(args) => apply::run(args).await,
        Commands::Status(args) => status::run(args).await,
        Commands::Hosts(args) => hosts::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("{CROSS} {}", RED.apply_to(format!("{e:#}")));
        std::process::exit(1);
    }
}
