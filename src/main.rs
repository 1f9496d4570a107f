use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use paybridge::app;
use paybridge::cli::{Cli, Command};
use paybridge::config::BridgeConfig;
use paybridge::observability::init_logging;
use paybridge::orchestrator::{OrchestratorClient, VariableSet};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = BridgeConfig::load(&cli.config)?;
    cli.apply(&mut config);
    init_logging(config.log_format, cli.verbose);

    let client = app::connect(&config)?;

    match cli.selected() {
        Command::Serve => serve(&config, client).await,
        Command::Deploy => deploy(&config, client.as_ref()).await,
        Command::Start { variables } => {
            let variables: VariableSet =
                serde_json::from_str(&variables).context("variables must be a JSON object")?;
            let instance = client
                .start_instance(&config.process_id, &variables)
                .await
                .context("failed to start process instance")?;
            println!("{}", instance.process_instance_key);
            Ok(())
        }
    }
}

async fn deploy(config: &BridgeConfig, client: &dyn OrchestratorClient) -> Result<()> {
    let deployment = client
        .deploy_resource(&config.process_resource)
        .await
        .with_context(|| format!("failed to deploy {}", config.process_resource.display()))?;

    for process in deployment.processes() {
        tracing::info!(
            deployment = %deployment.deployment_key,
            process = %process.process_definition_id,
            version = process.process_definition_version,
            "process definition deployed"
        );
    }
    Ok(())
}

async fn serve(
    config: &BridgeConfig,
    client: Arc<dyn OrchestratorClient>,
) -> Result<()> {
    deploy(config, client.as_ref()).await?;

    let worker = Arc::new(app::build_worker(config, client.clone())?);
    let subscriptions = worker.open();

    let listener = TcpListener::bind(("0.0.0.0", config.listen_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.listen_port))?;
    tracing::info!(port = config.listen_port, "payment ingress listening");

    let served = paybridge::ingress::serve(listener, app::ingress_state(config, client), async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
    })
    .await;

    for subscription in subscriptions {
        subscription.close().await;
    }
    served.context("ingress server error")
}
