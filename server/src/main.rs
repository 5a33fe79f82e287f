use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use eventdesk_server::auth::JwtIdentityProvider;
use eventdesk_server::config::{Config, StoreBackend};
use eventdesk_server::routes::create_routes;
use eventdesk_server::state::AppState;
use eventdesk_server::store::{MemoryTicketStore, PgTicketStore, TicketStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn TicketStore> = match config.store_backend {
        StoreBackend::Postgres => {
            let store = PgTicketStore::connect(&config.database_url, config.db_max_connections).await?;
            tracing::info!("Successfully connected to database");

            store.migrate().await?;
            tracing::info!("Migrations run successfully");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory ticket store; data is lost on restart");
            Arc::new(MemoryTicketStore::new())
        }
    };

    let identity = Arc::new(JwtIdentityProvider::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let app = create_routes(AppState::new(store, identity, config.retry));

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server running at http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
