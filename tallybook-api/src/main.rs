//! # Tallybook API Server
//!
//! REST API for the Tallybook multi-tenant finance tracker. Access to
//! every book, account, and transaction is governed by team-membership
//! RBAC in `tallybook-shared`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p tallybook-api
//! ```

use std::sync::Arc;

use tallybook_shared::db::{migrations, pool};
use tallybook_shared::store::postgres::PgStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tallybook_api::app::{build_router, AppState};
use tallybook_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tallybook_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Tallybook API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let db_pool = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    migrations::run_migrations(&db_pool).await?;

    let state = AppState::new(Arc::new(PgStore::new(db_pool)), config.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server listening on http://{}", config.bind_address());

    axum::serve(listener, app).await?;

    Ok(())
}
