//! Example service: tenant login and tenant-scoped reads over a master registry.
//!
//! Run from repo root: `cargo run -p example-consumer`

use std::sync::Arc;
use tenant_router::{
    admin_routes, common_routes, ensure_database_exists, ensure_master_tables, tenant_routes, AppState,
    ConnectionRouter, PgPoolConnector, PgTenantRegistry, Settings, TenantPoolCache,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tenant_router=info,example_consumer=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let master_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.master_pool_max)
        .connect(&settings.database_url)
        .await?;
    ensure_master_tables(&master_pool, &settings.master_schema).await?;

    let registry = Arc::new(PgTenantRegistry::new(master_pool.clone(), settings.registry_table()));
    let cache = Arc::new(TenantPoolCache::new(Arc::new(PgPoolConnector), settings.tenant_pool.clone()));
    let router = Arc::new(ConnectionRouter::new(registry, cache.clone()));

    if settings.warm_tenant_pools {
        match router.resolve_any().await {
            Ok(_) => tracing::info!(pools = cache.len(), "tenant pools warmed"),
            Err(e) => tracing::warn!(error = %e, "could not warm tenant pools"),
        }
    }

    if settings.admin_token.is_none() {
        tracing::info!("ADMIN_TOKEN not set, admin routes are disabled");
    }
    let state = AppState::new(master_pool, settings.registry_table(), router)
        .with_admin_token(settings.admin_token.clone());
    let app = common_routes(state.clone())
        .merge(tenant_routes(state.clone()))
        .merge(admin_routes(state));

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    cache.close_all().await;
    tracing::info!("tenant pools closed");
    Ok(())
}
