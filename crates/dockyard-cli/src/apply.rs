use crate::cli::ApplyArgs;
use crate::progress::ConsoleProgress;
use crate::style::{BOLD, ROCKET, WARN};
use anyhow::{Context, Result};
use dockyard_engine::{
    ApplyOptions, DockerRuntime, PrivilegedHostsUpdater, Reconciler, TcpProxyClient, config_loader,
};
use dockyard_utils::env;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub async fn run(args: ApplyArgs) -> Result<()> {
    let home = env::get_home_dir().context("unable to determine the home directory")?;
    let environment = args.env.environment;
    let config = config_loader::load(&home, &environment)?;

    let runtime = DockerRuntime::connect().context("unable to connect to docker")?;
    let proxy = TcpProxyClient::new(env::proxy_addr());
    let hosts = PrivilegedHostsUpdater::current()?;
    let progress = ConsoleProgress::new();

    let options = ApplyOptions {
        skip_pull: args.skip_pull,
        skip_hosts: args.skip_hosts || !env::edit_hosts_enabled(),
        ..ApplyOptions::default()
    };
    debug!(
        environment = %environment,
        proxy = %proxy.addr(),
        skip_pull = options.skip_pull,
        skip_hosts = options.skip_hosts,
        "Starting apply"
    );

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing the current step");
                cancel.cancel();
            }
        }
    });

    let result = Reconciler::new(&home, &runtime, &proxy, &hosts)
        .with_progress(&progress)
        .with_options(options)
        .with_cancellation(cancel)
        .apply(&config)
        .await;
    interrupt.abort();

    match result {
        Ok(report) => {
            println!("{ROCKET} {} is up and running", BOLD.apply_to(&report.environment));
            Ok(())
        }
        Err(e) if e.environment_is_usable() => {
            println!("{WARN} {environment} is up, but sites may not resolve by name yet");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
