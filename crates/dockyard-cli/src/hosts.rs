use crate::cli::HostsArgs;
use crate::style::{CHECK, DIM};
use anyhow::{Context, Result};
use dockyard_core::HostsFileSection;
use dockyard_utils::env;
use tracing::info;

/// The privileged half of `apply`: rewrites the dockyard block of the hosts file.
pub async fn run(args: HostsArgs) -> Result<()> {
    if cfg!(windows) {
        anyhow::bail!("setting the hosts file is not supported on windows");
    }

    let section = env::hosts_file_override()
        .map_or_else(HostsFileSection::new, HostsFileSection::with_path);

    let changed = section
        .sync(&args.hostnames)
        .await
        .with_context(|| format!("unable to update {}", section.path().display()))?;

    if changed {
        info!(path = %section.path().display(), count = args.hostnames.len(), "Hosts file updated");
        println!("{CHECK} Updated {}", section.path().display());
    } else {
        println!("{}", DIM.apply_to(format!("{} is already up to date", section.path().display())));
    }
    Ok(())
}
