//! Application settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `IGD_*` environment variables, and an
//! optional configuration file, in increasing order of precedence.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::ticket::{DEFAULT_TOKEN_MIN_LENGTH, TicketCodec};
use crate::outbound::persistence::PoolConfig;

pub const DEFAULT_BIND_PORT: u16 = 8080;
pub const DEFAULT_TOKEN_SECRET: &str = "secret";
pub const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const POOL_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime configuration for the queue server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "IGD")]
pub struct AppSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Interface to listen on.
    pub bind_host: Option<IpAddr>,
    /// Port to listen on.
    pub bind_port: Option<u16>,
    /// Salt of the public ticket token alphabet.
    pub token_secret: Option<String>,
    /// Minimum public token length.
    pub token_min_length: Option<usize>,
    /// Maximum pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Apply pending migrations before serving.
    #[ortho_config(default = false)]
    pub run_migrations: bool,
}

impl AppSettings {
    /// The database URL, or `None` when unset or blank.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(
            self.bind_host.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            self.bind_port.unwrap_or(DEFAULT_BIND_PORT),
        )
    }

    pub fn token_secret(&self) -> &str {
        self.token_secret.as_deref().unwrap_or(DEFAULT_TOKEN_SECRET)
    }

    /// Whether tokens are salted with the built-in development secret.
    pub fn uses_default_token_secret(&self) -> bool {
        self.token_secret() == DEFAULT_TOKEN_SECRET
    }

    pub fn token_min_length(&self) -> usize {
        self.token_min_length.unwrap_or(DEFAULT_TOKEN_MIN_LENGTH)
    }

    /// Codec configured with the token secret and minimum length.
    pub fn ticket_codec(&self) -> TicketCodec {
        TicketCodec::new(self.token_secret(), self.token_min_length())
    }

    /// Pool configuration for `database_url`.
    pub fn pool_config(&self, database_url: &str) -> PoolConfig {
        PoolConfig::new(database_url)
            .with_max_size(self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE).max(1))
            .with_connection_timeout(POOL_CHECKOUT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    //! Settings resolution from the environment.

    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    const VARS: [&str; 7] = [
        "IGD_DATABASE_URL",
        "IGD_BIND_HOST",
        "IGD_BIND_PORT",
        "IGD_TOKEN_SECRET",
        "IGD_TOKEN_MIN_LENGTH",
        "IGD_POOL_MAX_SIZE",
        "IGD_RUN_MIGRATIONS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("ed-queue")]).expect("settings should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), None);
        assert_eq!(settings.bind_addr(), SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(settings.token_secret(), "secret");
        assert!(settings.uses_default_token_secret());
        assert_eq!(settings.token_min_length(), DEFAULT_TOKEN_MIN_LENGTH);
        assert!(!settings.run_migrations);
        assert_eq!(
            settings.pool_config("postgres://localhost/igd").max_size(),
            10
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("IGD_DATABASE_URL", Some("postgres://igd@db/igd".to_owned())),
            ("IGD_BIND_HOST", Some("127.0.0.1".to_owned())),
            ("IGD_BIND_PORT", Some("9090".to_owned())),
            ("IGD_TOKEN_SECRET", Some("rsud-cianjur".to_owned())),
            ("IGD_TOKEN_MIN_LENGTH", Some("12".to_owned())),
            ("IGD_POOL_MAX_SIZE", Some("4".to_owned())),
            ("IGD_RUN_MIGRATIONS", Some("true".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url(), Some("postgres://igd@db/igd"));
        assert_eq!(
            settings.bind_addr(),
            SocketAddr::from(([127, 0, 0, 1], 9090))
        );
        assert!(!settings.uses_default_token_secret());
        assert_eq!(settings.token_min_length(), 12);
        assert!(settings.run_migrations);
        assert_eq!(settings.pool_config("postgres://igd@db/igd").max_size(), 4);
    }

    #[rstest]
    fn blank_database_url_counts_as_unset() {
        let _guard = lock_env(VARS.map(|name| {
            let value = (name == "IGD_DATABASE_URL").then(|| "   ".to_owned());
            (name, value)
        }));

        assert_eq!(load_from_empty_args().database_url(), None);
    }
}
