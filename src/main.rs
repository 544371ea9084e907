use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use academy::api::router;
use academy::config::AppConfig;
use academy::db;
use academy::identity::{AccountClient, AccountHttpClient, LocalAccountClient};
use academy::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "academy=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let pool = db::connect(&config.database_url, config.max_connections).await?;

    let accounts: Arc<dyn AccountClient> = match config.identity.clone() {
        Some(identity) => Arc::new(AccountHttpClient::new(identity)?),
        None => {
            warn!("IDENTITY_BASE_URL not set, using local accounts");
            Arc::new(LocalAccountClient)
        }
    };

    let state = AppState::new(pool, accounts, config.batch_group_size);

    match &config.bootstrap_admin {
        Some(seed) => {
            if state.admins().bootstrap(seed).await?.is_some() {
                info!("created superadmin {}", seed.admin_id);
            }
        }
        None => {
            if state.admins().list().await?.is_empty() {
                warn!("no admins exist and ACADEMY_BOOTSTRAP_ADMIN is not set, every request will be refused");
            }
        }
    }

    let pending = state.feed.refresh(&state.db).await?;
    info!("{} enrollments awaiting review", pending);

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
