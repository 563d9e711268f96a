use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dockyard")]
#[command(version)]
#[command(about = "Declarative local development environments on Docker", long_about = None)]
pub struct Cli {
    /// Show debug logs on stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Make the running containers match the environment file
    ///
    /// Creates, starts or recreates databases, services and sites as needed,
    /// configures the proxy, then adds every site hostname to the hosts file.
    Apply(ApplyArgs),
    /// List the containers of an environment
    Status(StatusArgs),
    /// Rewrite the dockyard section of the hosts file (requires root)
    #[command(hide = true)]
    Hosts(HostsArgs),
}

#[derive(Args)]
pub struct EnvironmentArg {
    /// Name of the environment to use
    #[arg(long, short, env = "DOCKYARD_ENV", default_value = "dockyard-dev")]
    pub environment: String,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub env: EnvironmentArg,

    /// Skip pulling images
    #[arg(long)]
    pub skip_pull: bool,

    /// Skip modifying the hosts file
    #[arg(long)]
    pub skip_hosts: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub env: EnvironmentArg,
}

#[derive(Args)]
pub struct HostsArgs {
    /// Comma-separated hostnames to point at 127.0.0.1
    #[arg(long, value_delimiter = ',')]
    pub hostnames: Vec<String>,
}
