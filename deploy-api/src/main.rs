use deploy_api::{config::ApiConfig, startup::Application};
use deploy_config::{load_config, shared::ClusterConfig};
use deploy_telemetry::tracing::init_tracing;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // Initialize tracing from the binary name
    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    // We start the runtime.
    actix_web::rt::System::new().block_on(async_main())?;

    Ok(())
}

async fn async_main() -> anyhow::Result<()> {
    let config = load_config::<ApiConfig>()?;
    log_cluster_config(&config.cluster);

    let application = Application::build(config).await?;
    info!(port = application.port(), "deployments api listening");
    application.run_until_stopped().await?;

    Ok(())
}

fn log_cluster_config(config: &ClusterConfig) {
    // The token is secret-wrapped and must never reach the logs.
    info!(api_url = %config.api_url, "cluster options");
}
