//! Request correlation middleware.
//!
//! Each request runs inside a [`TraceId`] scope. A well-formed `trace-id`
//! request header is reused so a kiosk and the backend log the same
//! identifier; otherwise a fresh one is generated. The identifier is echoed
//! on every response and each request is logged on completion.
//!
//! Task-locals do not follow spawned tasks; wrap spawned work in
//! [`TraceId::scope`] to keep the identifier.

use std::task::{Context, Poll};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::{error, info};

use crate::domain::{TRACE_ID_HEADER, TraceId};

/// Middleware attaching a request-scoped [`TraceId`].
///
/// # Examples
/// ```
/// use actix_web::App;
/// use ed_queue::middleware::Trace;
///
/// let _app = App::new().wrap(Trace);
/// ```
#[derive(Clone)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware { service }))
    }
}

/// Service produced by [`Trace`].
pub struct TraceMiddleware<S> {
    service: S,
}

fn inbound_trace_id(req: &ServiceRequest) -> Option<TraceId> {
    req.headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(TraceId::from_header_value)
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let trace_id = inbound_trace_id(&req).unwrap_or_else(TraceId::generate);
        let method = req.method().clone();
        let path = req.path().to_owned();
        let started = Instant::now();
        let fut = self.service.call(req);
        Box::pin(TraceId::scope(trace_id, async move {
            let mut res = fut.await?;
            match HeaderValue::from_str(&trace_id.to_string()) {
                Ok(value) => {
                    res.response_mut()
                        .headers_mut()
                        .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                }
                Err(error) => {
                    error!(%error, %trace_id, "failed to encode trace identifier header");
                }
            }
            info!(
                %trace_id,
                %method,
                path,
                status = res.status().as_u16(),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "request completed",
            );
            Ok(res)
        }))
    }
}
