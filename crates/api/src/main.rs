use std::sync::Arc;

use anyhow::Context;

use ledgerdesk_api::config::ApiConfig;
use ledgerdesk_infra::{Books, PostgresBookStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ledgerdesk_observability::init();

    let config = ApiConfig::from_env()?;

    let books = match &config.database_url {
        Some(url) => {
            let store = PostgresBookStore::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to Postgres")?;
            store.migrate().await.context("failed to apply schema")?;
            tracing::info!("using Postgres store");
            Books::new(Arc::new(store))
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory store");
            Books::in_memory()
        }
    };

    let app = ledgerdesk_api::app::build_app_with(config.jwt_secret, books);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
