//! Async connection pool for the queue database.
//!
//! Wraps `diesel-async` and `bb8`. The pool is built once at startup and
//! cloned into each repository adapter; checkouts honour the configured
//! timeout so a saturated database surfaces as a connection error rather
//! than a hung request.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

/// Errors raised while building the pool or checking out a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },

    #[error("failed to build connection pool: {message}")]
    Build { message: String },
}

impl PoolError {
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    /// Underlying driver message, whatever the stage that failed.
    pub fn into_message(self) -> String {
        match self {
            Self::Checkout { message } | Self::Build { message } => message,
        }
    }
}

/// Pool sizing and checkout limits.
///
/// # Examples
/// ```
/// use std::time::Duration;
///
/// use ed_queue::outbound::persistence::PoolConfig;
///
/// let config = PoolConfig::new("postgres://igd@localhost/igd")
///     .with_max_size(20)
///     .with_connection_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_size(), 20);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Defaults: 10 connections, 2 idle, 30 second checkout timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            min_idle: Some(2),
            connection_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }
}

/// Shared PostgreSQL connection pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Build`] when the manager rejects the
    /// configuration or the initial idle connections cannot be opened.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
        let inner = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle.map(|idle| idle.min(config.max_size)))
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;
        Ok(Self { inner })
    }

    /// Check out a connection.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Checkout`] when no connection frees up within
    /// the configured timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}
