//! Actix-web extractor for admin sessions.
//!
//! The session token is read from the `wg_session` cookie, or from an
//! `Authorization: Bearer` header for API clients. Token values are never
//! logged.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use std::future::{Ready, ready};

use super::{SESSION_COOKIE, SessionKeys};
use crate::error::ErrorResponse;
use crate::models::SessionClaims;

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl AuthError {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
        })
    }
}

/// Extractor that requires a valid admin session.
///
/// ```ignore
/// async fn protected_handler(admin: AdminSession) -> impl Responder {
///     // admin.claims identifies the logged-in administrator
/// }
/// ```
pub struct AdminSession {
    pub claims: SessionClaims,
}

/// Session token from the cookie, falling back to a bearer header.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE)
        && !cookie.value().is_empty()
    {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl FromRequest for AdminSession {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(keys) = req.app_data::<web::Data<SessionKeys>>() else {
            return ready(Err(AuthError::new("Internal configuration error")));
        };

        let Some(token) = session_token(req) else {
            return ready(Err(AuthError::new(
                "Admin session required. Log in first.",
            )));
        };

        match keys.verify(&token) {
            Ok(claims) if claims.admin_id().is_some() => ready(Ok(AdminSession { claims })),
            Ok(_) => ready(Err(AuthError::new("Malformed session"))),
            Err(_) => ready(Err(AuthError::new("Session expired or invalid"))),
        }
    }
}
