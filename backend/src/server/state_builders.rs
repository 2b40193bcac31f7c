//! Builders wiring repositories and services into HTTP state.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use ed_queue::domain::ports::{FixtureVisitCommand, FixtureVisitQuery};
use ed_queue::domain::{Sleeper, TokioSleeper, VisitService};
use ed_queue::inbound::http::state::HttpState;
use ed_queue::outbound::persistence::{DieselPatientRepository, DieselVisitRepository};

use super::ServerConfig;

/// Build handler state, falling back to fixtures when no pool is configured.
pub(crate) fn build_http_state(config: &ServerConfig) -> HttpState {
    let Some(pool) = &config.db_pool else {
        return HttpState::new(Arc::new(FixtureVisitCommand), Arc::new(FixtureVisitQuery));
    };

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let service = Arc::new(VisitService::new(
        Arc::new(DieselPatientRepository::new(pool.clone())),
        Arc::new(DieselVisitRepository::new(pool.clone())),
        config.codec.clone(),
        clock,
        sleeper,
    ));
    HttpState::new(service.clone(), service)
}
