//! Database module providing connection management and queries.

pub mod admins;
pub mod animals;

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use sea_orm_migration::MigratorTrait;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;
use crate::models::{Animal, AnimalFilter, AnimalPatch, AnimalUpload, CategoryCount};

/// Process-wide pool, opened on first use.
static SHARED_POOL: OnceCell<DbPool> = OnceCell::const_new();

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Open a new connection pool from configuration.
    pub async fn new(config: &Config) -> AppResult<Self> {
        let mut options = ConnectOptions::new(config.database.url.clone());
        options
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(Self { conn })
    }

    /// Get the process-wide pool, connecting on first call.
    ///
    /// Concurrent first callers wait on the same connection attempt; a failed
    /// attempt leaves the cell empty so the next caller retries.
    pub async fn shared(config: &Config) -> AppResult<&'static DbPool> {
        SHARED_POOL
            .get_or_try_init(|| async {
                let pool = Self::new(config).await?;
                info!("Database connection established");
                Ok::<_, AppError>(pool)
            })
            .await
    }

    /// Get access to the connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply all pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))
    }
}

/// Whether a database error is a unique index violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Result of merging an upload into the animal store.
#[derive(Debug, Clone)]
pub struct UpsertedAnimal {
    pub animal: Animal,
    /// True when the upload created the record.
    pub created: bool,
}

/// Persistent store of animal records.
///
/// `append_upload` must be atomic per animal name: two uploads for the same
/// name may run concurrently and both batches must end up in the record.
#[async_trait]
pub trait AnimalStore: Send + Sync {
    /// Find an animal by exact, case-sensitive name.
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Animal>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Animal>>;

    /// List animals matching `filter`, ordered by name.
    async fn list(&self, filter: &AnimalFilter) -> AppResult<Vec<Animal>>;

    /// Count animals per category, covering every category.
    async fn category_counts(&self) -> AppResult<Vec<CategoryCount>>;

    /// Append an upload to the record with the same name, or create it.
    async fn append_upload(&self, upload: &AnimalUpload) -> AppResult<UpsertedAnimal>;

    /// Edit descriptive fields. Returns `None` if the animal does not exist.
    async fn update(&self, id: Uuid, patch: &AnimalPatch) -> AppResult<Option<Animal>>;

    /// Delete an animal. Returns false if it did not exist.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}
