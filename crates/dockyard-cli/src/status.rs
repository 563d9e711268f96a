use crate::cli::StatusArgs;
use crate::style::{DOT, GREEN, YELLOW};
use anyhow::{Context, Result};
use dockyard_core::labels;
use dockyard_engine::{DockerRuntime, RuntimeInspector, blueprint};

pub async fn run(args: StatusArgs) -> Result<()> {
    let environment = args.env.environment;
    let runtime = DockerRuntime::connect().context("unable to connect to docker")?;
    let inspector = RuntimeInspector::new(&runtime);

    let mut containers = inspector
        .find_containers(&blueprint::proxy_predicate(&environment))
        .await?;
    containers.extend(inspector.environment_containers(&environment).await?);

    if containers.is_empty() {
        println!("There are no containers for {environment}; run `dockyard apply` first");
        return Ok(());
    }

    for container in containers {
        let kind = if container.labels.contains_key(labels::PROXY) {
            "proxy"
        } else {
            container.labels.get(labels::TYPE).map_or("-", String::as_str)
        };
        let state = if container.is_running() {
            GREEN.apply_to("running")
        } else {
            YELLOW.apply_to("stopped")
        };
        println!("{DOT} {:<32} {kind:<10} {state}", container.name);
    }
    Ok(())
}
