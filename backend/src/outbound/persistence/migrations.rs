//! Embedded schema migrations.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying migrations.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("failed to connect for migrations: {0}")]
    Connect(#[from] diesel::ConnectionError),
    #[error("failed to apply migrations: {0}")]
    Apply(String),
    #[error("migration task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Apply every pending migration against `database_url`.
///
/// Migrations run on a blocking connection, so the work is moved off the
/// async runtime.
pub async fn run_pending_migrations(database_url: &str) -> Result<(), MigrationError> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || -> Result<(), MigrationError> {
        let mut connection = PgConnection::establish(&url)?;
        let applied = connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| MigrationError::Apply(err.to_string()))?;
        for version in &applied {
            info!(%version, "applied migration");
        }
        Ok(())
    })
    .await?
}
