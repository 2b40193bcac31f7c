//! Queue server entry-point: loads settings, prepares the database, and
//! serves the REST API.

mod server;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ed_queue::inbound::http::health::HealthState;
use ed_queue::outbound::persistence::{DbPool, run_pending_migrations};
use ed_queue::settings::AppSettings;

use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load()
        .map_err(|err| std::io::Error::other(format!("failed to load settings: {err}")))?;

    if settings.uses_default_token_secret() && !cfg!(debug_assertions) {
        warn!("IGD_TOKEN_SECRET is unset; public tokens use the default salt");
    }

    let mut config = ServerConfig::new(settings.bind_addr(), settings.ticket_codec());
    match settings.database_url() {
        Some(url) => {
            if settings.run_migrations {
                run_pending_migrations(url)
                    .await
                    .map_err(|err| std::io::Error::other(err.to_string()))?;
            }
            let pool = DbPool::new(settings.pool_config(url))
                .await
                .map_err(|err| std::io::Error::other(err.to_string()))?;
            config = config.with_db_pool(pool);
        }
        None if cfg!(debug_assertions) => {
            warn!("IGD_DATABASE_URL is unset; serving fixture data");
        }
        None => {
            return Err(std::io::Error::other("IGD_DATABASE_URL must be set"));
        }
    }

    let health_state = web::Data::new(HealthState::new());
    let bind_addr = settings.bind_addr();
    let server = create_server(health_state.clone(), config)?;
    info!(%bind_addr, "queue server listening");

    let result = server.await;
    health_state.mark_unhealthy();
    result
}
