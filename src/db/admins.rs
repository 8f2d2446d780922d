//! Database operations for administrator accounts.

use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

use crate::entity::admin;
use crate::error::{AppError, AppResult};
use crate::models::Admin;

use super::is_unique_violation;

/// Find an admin by email (exact match after lowercasing).
pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> AppResult<Option<Admin>> {
    let result = admin::Entity::find()
        .filter(admin::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?;

    Ok(result.map(model_to_admin))
}

/// Find an admin by ID.
pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> AppResult<Option<Admin>> {
    let result = admin::Entity::find_by_id(id).one(db).await?;
    Ok(result.map(model_to_admin))
}

/// Insert a new admin. Fails with `InvalidInput` if the email is taken.
pub async fn insert(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    password_hash: &str,
) -> AppResult<Admin> {
    let model = admin::ActiveModel {
        id: Set(Uuid::now_v7()),
        name: Set(name.trim().to_string()),
        email: Set(normalize_email(email)),
        password_hash: Set(password_hash.to_string()),
        created_at: Set(Utc::now()),
    };

    match model.insert(db).await {
        Ok(inserted) => Ok(model_to_admin(inserted)),
        Err(e) if is_unique_violation(&e) => {
            Err(AppError::InvalidInput("Admin already exists".to_string()))
        }
        Err(e) => Err(AppError::Database(format!("Failed to insert admin: {}", e))),
    }
}

/// Emails are stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn model_to_admin(m: admin::Model) -> Admin {
    Admin {
        id: m.id,
        name: m.name,
        email: m.email,
        password_hash: m.password_hash,
        created_at: m.created_at,
    }
}
