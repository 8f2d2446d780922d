//! Administrator account endpoints.
//!
//! - POST /admin/accounts: create an admin (X-Admin-Key bootstrap)
//! - POST /auth/login: email/password login, sets the session cookie
//! - POST /auth/logout: clear the session cookie
//! - GET /auth/me: current admin from the session, or null

use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::auth::{self, AdminKey, SESSION_COOKIE, SessionKeys};
use crate::config::{ADMIN_KEY_HEADER, Config};
use crate::db::{DbPool, admins};
use crate::error::{AppError, AppResult};
use crate::models::{AdminResponse, CreateAdminRequest, LoginRequest};

/// Shortest accepted password.
const MIN_PASSWORD_LEN: usize = 8;

/// Same message for unknown email and wrong password.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Configure admin account routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_admin)
        .service(login)
        .service(logout)
        .service(get_current_admin);
}

/// Login response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub admin: AdminResponse,
}

/// Create an administrator account.
///
/// POST /api/v1/admin/accounts
/// Authorization: X-Admin-Key (bootstrap)
#[utoipa::path(
    post,
    path = "/api/v1/admin/accounts",
    tag = "Auth",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = AdminResponse),
        (status = 400, description = "Invalid input or admin already exists", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing or invalid admin key", body = crate::error::ErrorResponse)
    ),
    security(
        ("admin_key" = [])
    )
)]
#[post("/admin/accounts")]
pub async fn create_admin(
    req: HttpRequest,
    body: web::Json<CreateAdminRequest>,
    admin_key: web::Data<AdminKey>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let provided = req
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthorized("Missing admin key. Provide X-Admin-Key header.".to_string())
        })?;

    if !admin_key.verify(provided) {
        warn!("Admin account creation rejected: invalid admin key");
        return Err(AppError::Unauthorized("Invalid admin key".to_string()));
    }

    validate_new_admin(&body)?;

    let password_hash = auth::hash_password(&body.password)?;
    let admin = admins::insert(pool.connection(), &body.name, &body.email, &password_hash).await?;

    info!("Created admin {} ({})", admin.email, admin.id);

    Ok(HttpResponse::Created().json(AdminResponse::from(admin)))
}

/// Log in with email and password.
///
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
#[post("/auth/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    keys: web::Data<SessionKeys>,
    config: web::Data<Config>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let (email, password) = match (body.email.as_deref(), body.password.as_deref()) {
        (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => {
            return Err(AppError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }
    };

    let admin = admins::find_by_email(pool.connection(), email).await?;
    let verified =
        auth::verify_login(password, admin.as_ref().map(|a| a.password_hash.as_str()));
    let admin = match admin {
        Some(a) if verified => a,
        _ => {
            warn!("Failed login attempt");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let token = keys.issue(&admin)?;
    let cookie = session_cookie(
        token,
        time::Duration::seconds(keys.ttl_secs() as i64),
        config.environment.is_production(),
    );

    info!("Admin {} logged in", admin.email);

    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        admin: admin.into(),
    }))
}

/// Log out by clearing the session cookie.
///
/// POST /api/v1/auth/logout
#[post("/auth/logout")]
pub async fn logout(config: web::Data<Config>) -> HttpResponse {
    let cookie = session_cookie(
        String::new(),
        time::Duration::ZERO,
        config.environment.is_production(),
    );

    HttpResponse::Ok()
        .cookie(cookie)
        .json(serde_json::json!({ "message": "Logged out" }))
}

/// Current admin from the session.
///
/// GET /api/v1/auth/me
#[get("/auth/me")]
pub async fn get_current_admin(
    req: HttpRequest,
    keys: web::Data<SessionKeys>,
    pool: web::Data<DbPool>,
) -> AppResult<HttpResponse> {
    let Some(token) = auth::session_token(&req) else {
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "admin": null })));
    };

    let Some(admin_id) = keys.verify(&token).ok().and_then(|c| c.admin_id()) else {
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "admin": null })));
    };

    match admins::find_by_id(pool.connection(), admin_id).await? {
        Some(admin) => {
            let response: AdminResponse = admin.into();
            Ok(HttpResponse::Ok().json(serde_json::json!({ "admin": response })))
        }
        None => Ok(HttpResponse::Ok().json(serde_json::json!({ "admin": null }))),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn validate_new_admin(body: &CreateAdminRequest) -> AppResult<()> {
    if body.name.trim().is_empty() {
        return Err(AppError::InvalidInput("Name is required".to_string()));
    }
    let email = body.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidInput("A valid email is required".to_string()));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// HttpOnly session cookie. An empty value with zero max-age clears it.
fn session_cookie(value: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie.set_max_age(max_age);
    cookie
}
