//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use ed_queue::ApiDoc;
use ed_queue::Trace;
use ed_queue::inbound::http::configure_api;
use ed_queue::inbound::http::health::{HealthState, live, ready};
use ed_queue::inbound::http::state::HttpState;

use state_builders::build_http_state;

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(Trace)
        .service(web::scope("/api/v1").configure(configure_api))
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind the HTTP server.
///
/// Readiness is flipped once the listener is bound; the returned [`Server`]
/// must be awaited to serve requests.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = web::Data::new(build_http_state(&config));
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
