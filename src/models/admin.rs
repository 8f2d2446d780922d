//! Administrator accounts and session payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Administrator stored in database.
#[derive(Debug, Clone)]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of an administrator.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<Admin> for AdminResponse {
    fn from(a: Admin) -> Self {
        Self {
            id: a.id,
            name: a.name,
            email: a.email,
        }
    }
}

/// Request to create an administrator account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Email/password login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Session JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iss: String,
    pub exp: usize,
    pub iat: usize,
    pub email: String,
    pub name: String,
}

impl SessionClaims {
    /// The admin id carried in `sub`.
    pub fn admin_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}
