use std::sync::Arc;

use anyhow::Context;

use gatehouse_api::app::{AppServices, build_app};
use gatehouse_auth::DirectoryStore;
use gatehouse_infra::{InMemoryDirectory, PostgresDirectory, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gatehouse_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;
    let areas = settings.areas().context("failed to load areas")?;

    let directory: Arc<dyn DirectoryStore> = match &settings.database_url {
        Some(url) => {
            let postgres = PostgresDirectory::connect(url)
                .await
                .context("failed to connect to the directory database")?;
            postgres.ensure_schema().await.context("failed to prepare directory schema")?;
            Arc::new(postgres)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using an empty in-memory directory");
            Arc::new(InMemoryDirectory::new())
        }
    };

    tracing::info!(areas = areas.len(), "areas loaded");

    let services = AppServices::new(areas, directory, settings.session_timeout);
    let app = build_app(settings.jwt_secret.clone(), services);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
