//! BatchJob operator - reconciles BatchJobs and serves the placement API

mod config;
mod controller_runner;

use std::sync::Arc;

use clap::Parser;
use kube::{Api, Client, CustomResourceExt};

use batchjob_common::crd::BatchJob;
use batchjob_common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};
use batchjob_common::{BATCHJOB_GROUP, FIELD_MANAGER};
use batchjob_controller::Context;
use batchjob_extender::{start_server, ApiState, KubeClusterView};

use config::{Cli, Commands, RunArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Crd) => {
            let crd = serde_yaml::to_string(&BatchJob::crd())
                .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
            println!("{crd}");
            Ok(())
        }
        Some(Commands::Run) | None => run(cli.run).await,
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let format = if args.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    let _telemetry = init_telemetry(TelemetryConfig {
        format,
        ..Default::default()
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if args.install_crds {
        ensure_crds_installed(&client).await?;
    }

    let ctx = Arc::new(Context::from_client(
        client.clone(),
        args.controller_config(),
    ));
    let state = ApiState {
        ctx: ctx.clone(),
        cluster: Arc::new(KubeClusterView::new(client.clone())),
        config: args.extender_config(),
    };

    let controller =
        controller_runner::build_batchjob_controller(client, args.watch_namespace.as_deref(), ctx);

    tracing::info!(
        listen_addr = %args.listen_addr,
        scheduler_name = %args.scheduler_name,
        namespace = args.watch_namespace.as_deref().unwrap_or("*"),
        "Starting BatchJob operator"
    );

    tokio::select! {
        _ = controller => {
            tracing::info!("BatchJob controller completed");
        }
        result = start_server(args.listen_addr, state, shutdown_signal()) => {
            result.map_err(|e| anyhow::anyhow!("Extender API failed: {}", e))?;
            tracing::info!("Extender API stopped");
        }
    }

    tracing::info!("BatchJob operator shutting down");
    Ok(())
}

/// Install the BatchJob CRD with server-side apply
async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    tracing::info!("Installing BatchJob CRD...");
    crds.patch(
        &format!("batchjobs.{BATCHJOB_GROUP}"),
        &params,
        &Patch::Apply(&BatchJob::crd()),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to install BatchJob CRD: {}", e))?;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
