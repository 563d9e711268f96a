//! Running dockyard subcommands as root.
//!
//! The hosts file can only be written by root, so `apply` re-invokes its own
//! executable through `sudo` rather than requiring the whole CLI to run
//! elevated.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Subcommand the privileged helper is invoked with.
pub const HOSTS_SUBCOMMAND: &str = "hosts";

/// Path of the running executable.
///
/// # Errors
///
/// Returns an error if `current_exe` fails.
pub fn current_exe() -> Result<PathBuf> {
    std::env::current_exe().context("unable to locate the dockyard executable")
}

/// Arguments for `<exe> hosts --hostnames=a,b,c`.
pub fn hosts_args(hostnames: &[String]) -> Vec<OsString> {
    vec![
        OsString::from(HOSTS_SUBCOMMAND),
        OsString::from(format!("--hostnames={}", hostnames.join(","))),
    ]
}

/// Build a command that runs `exe args...` as root.
///
/// When already root the executable is run directly; otherwise through `sudo`,
/// which may prompt for a password on the controlling terminal. Environment
/// overrides the helper reads are forwarded explicitly since `sudo` resets the
/// environment.
pub fn tokio_command(exe: &Path, args: &[OsString]) -> tokio::process::Command {
    let mut cmd = if is_root() {
        tokio::process::Command::new(exe)
    } else {
        let mut sudo = tokio::process::Command::new("sudo");
        if let Some(path) = crate::env::hosts_file_override() {
            sudo.arg(format!("{}={}", crate::env::HOSTS_FILE_VAR, path.display()));
        }
        sudo.arg(exe);
        sudo
    };
    cmd.args(args);
    cmd.env_remove("LD_LIBRARY_PATH");
    debug!(exe = %exe.display(), root = is_root(), "Prepared privileged command");
    cmd
}

/// Run `exe args...` as root and wait for it.
///
/// # Errors
///
/// Returns an error if the process cannot be spawned or exits unsuccessfully.
pub async fn run(exe: &Path, args: &[OsString]) -> Result<()> {
    info!("Running {} with elevated privileges", exe.display());
    let status = tokio_command(exe, args)
        .status()
        .await
        .context("failed to spawn the privileged helper")?;

    if !status.success() {
        anyhow::bail!(
            "privileged helper exited with {}",
            status
                .code()
                .map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
        );
    }
    Ok(())
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_args_are_comma_joined() {
        let args = hosts_args(&["a.test".to_string(), "www.a.test".to_string()]);
        assert_eq!(
            args,
            vec![
                OsString::from("hosts"),
                OsString::from("--hostnames=a.test,www.a.test")
            ]
        );
    }
}
