//! Request logging middleware: one line when a request starts, one when it
//! completes. Both lines carry the same short request id.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::StatusCode;
use actix_web::http::header::{AUTHORIZATION, USER_AGENT};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::SESSION_COOKIE;

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    service: S,
}

/// What gets logged about a request.
struct RequestSummary {
    id: String,
    method: String,
    path: String,
}

impl RequestSummary {
    fn completed(&self, status: StatusCode, elapsed: Duration) {
        let status_code = status.as_u16();
        let duration_ms = elapsed.as_millis();

        if status.is_server_error() {
            error!(target: "api", request_id = %self.id, method = %self.method, path = %self.path,
                status = status_code, duration_ms = duration_ms, "← Server error");
        } else if status.is_client_error() {
            warn!(target: "api", request_id = %self.id, method = %self.method, path = %self.path,
                status = status_code, duration_ms = duration_ms, "← Client error");
        } else {
            info!(target: "api", request_id = %self.id, method = %self.method, path = %self.path,
                status = status_code, duration_ms = duration_ms, "← Request completed");
        }
    }
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);

        let summary = RequestSummary {
            id,
            method: req.method().to_string(),
            path: req.path().to_string(),
        };

        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();
        let user_agent = req
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        // Presence only; token values are never logged.
        let has_session =
            req.cookie(SESSION_COOKIE).is_some() || req.headers().contains_key(AUTHORIZATION);

        info!(
            target: "api",
            request_id = %summary.id,
            method = %summary.method,
            path = %summary.path,
            query = %req.query_string(),
            remote_addr = %remote_addr,
            user_agent = %user_agent,
            session = has_session,
            "→ Request started"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            summary.completed(res.status(), start.elapsed());
            Ok(res)
        })
    }
}
