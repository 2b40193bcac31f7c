//! HTTP inbound adapter exposing the queue REST endpoints.

pub mod error;
pub mod health;
pub mod monitoring;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod tickets;
pub mod validation;
pub mod visits;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api/v1` handler on the given scope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(visits::create_visit)
        .service(visits::get_visit)
        .service(visits::advance_visit)
        .service(tickets::validate_ticket)
        .service(tickets::encode_ticket)
        .service(tickets::status)
        .service(monitoring::active_queue)
        .service(monitoring::summary);
}
