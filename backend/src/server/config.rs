//! HTTP server configuration object.

use std::net::SocketAddr;

use ed_queue::domain::ticket::TicketCodec;
use ed_queue::outbound::persistence::DbPool;

/// Everything the server needs once settings are resolved.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) codec: TicketCodec,
    pub(crate) db_pool: Option<DbPool>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr, codec: TicketCodec) -> Self {
        Self {
            bind_addr,
            codec,
            db_pool: None,
        }
    }

    /// Attach the pool backing the visit repositories.
    ///
    /// Without a pool the server answers with fixture ports.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }
}
