use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use diploma_fiscal::api::{self, AppState};
use diploma_fiscal::batch::BatchProcessor;
use diploma_fiscal::cli::Cli;
use diploma_fiscal::registry::SchemaRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse_args();
    cli.validate().map_err(|e| anyhow::anyhow!(e))?;

    let fiscal_xsd = cli.fiscal_xsd_path();
    let diploma_xsd = cli.diploma_xsd_path();

    // Schema compilation is the only unrecoverable failure: refuse to
    // start without both schemas.
    let registry = Arc::new(
        SchemaRegistry::load(&fiscal_xsd, &diploma_xsd)
            .context("falha ao compilar os esquemas XSD")?,
    );
    info!(
        fiscal = %fiscal_xsd.display(),
        diploma = %diploma_xsd.display(),
        "schemas compiled"
    );

    let processor = Arc::new(
        BatchProcessor::new(Arc::clone(&registry), cli.batch_config())
            .context("falha ao criar o cliente HTTP")?,
    );

    let app = api::router(AppState {
        registry,
        processor,
    });

    let listener = tokio::net::TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("falha ao escutar em {}:{}", cli.host, cli.port))?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
