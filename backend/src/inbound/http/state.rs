//! Shared HTTP adapter state.
//!
//! Handlers receive this through `web::Data` and depend only on the driving
//! ports, so they can be exercised with fixtures or mocks.

use std::sync::Arc;

use crate::domain::ports::{VisitCommand, VisitQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub visits: Arc<dyn VisitCommand>,
    pub visits_query: Arc<dyn VisitQuery>,
}

impl HttpState {
    /// Bundle the visit ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use ed_queue::domain::ports::{FixtureVisitCommand, FixtureVisitQuery};
    /// use ed_queue::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(Arc::new(FixtureVisitCommand), Arc::new(FixtureVisitQuery));
    /// let _query = state.visits_query.clone();
    /// ```
    pub fn new(visits: Arc<dyn VisitCommand>, visits_query: Arc<dyn VisitQuery>) -> Self {
        Self {
            visits,
            visits_query,
        }
    }
}
