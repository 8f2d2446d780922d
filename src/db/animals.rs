//! Database operations for animals.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entity::animal::{self, ActiveModel, Entity as AnimalEntity};
use crate::error::{AppError, AppResult};
use crate::models::{
    Animal, AnimalFilter, AnimalPatch, AnimalUpload, Category, CategoryCount, ImageDetail,
};

use super::{AnimalStore, DbPool, UpsertedAnimal, is_unique_violation};

impl TryFrom<animal::Model> for Animal {
    type Error = AppError;

    fn try_from(m: animal::Model) -> AppResult<Self> {
        let category = Category::parse(&m.category).ok_or_else(|| {
            AppError::Database(format!(
                "Animal {} has unknown category '{}'",
                m.id, m.category
            ))
        })?;

        let image_details: Vec<ImageDetail> = serde_json::from_value(m.image_details)
            .map_err(|e| AppError::Database(format!("Corrupt image_details on {}: {}", m.id, e)))?;
        let images: Vec<String> = serde_json::from_value(m.images)
            .map_err(|e| AppError::Database(format!("Corrupt images on {}: {}", m.id, e)))?;

        Ok(Animal {
            id: m.id,
            name: m.name,
            species: m.species,
            description: m.description,
            category,
            location: m.location,
            image_details,
            images,
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Database(format!("Failed to encode image list: {}", e)))
}

impl DbPool {
    /// Append to an existing row under a row lock, or insert a new row.
    ///
    /// Returns `Ok(None)` when the insert lost a race against a concurrent
    /// upload that created the same name first.
    async fn try_append_upload(&self, upload: &AnimalUpload) -> AppResult<Option<UpsertedAnimal>> {
        let txn = self.connection().begin().await?;

        let existing = AnimalEntity::find()
            .filter(animal::Column::Name.eq(upload.name.as_str()))
            .lock_exclusive()
            .one(&txn)
            .await?;

        if let Some(model) = existing {
            let animal = append_locked(&txn, model, upload).await?;
            txn.commit().await?;
            return Ok(Some(UpsertedAnimal {
                animal,
                created: false,
            }));
        }

        let animal = Animal::create_from(upload, Uuid::now_v7());
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(animal.id),
            name: Set(animal.name.clone()),
            species: Set(animal.species.clone()),
            description: Set(animal.description.clone()),
            category: Set(animal.category.as_str().to_string()),
            location: Set(animal.location.clone()),
            image_details: Set(to_json(&animal.image_details)?),
            images: Set(to_json(&animal.images)?),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(&txn).await {
            Ok(_) => {
                txn.commit().await?;
                Ok(Some(UpsertedAnimal {
                    animal,
                    created: true,
                }))
            }
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Merge an upload into a row already locked by `txn`.
async fn append_locked(
    txn: &DatabaseTransaction,
    model: animal::Model,
    upload: &AnimalUpload,
) -> AppResult<Animal> {
    let mut animal = Animal::try_from(model.clone())?;
    animal.absorb(upload);

    let mut active: ActiveModel = model.into();
    active.species = Set(animal.species.clone());
    active.description = Set(animal.description.clone());
    active.image_details = Set(to_json(&animal.image_details)?);
    active.images = Set(to_json(&animal.images)?);
    active.updated_at = Set(Utc::now());
    active.update(txn).await?;

    Ok(animal)
}

#[async_trait]
impl AnimalStore for DbPool {
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Animal>> {
        AnimalEntity::find()
            .filter(animal::Column::Name.eq(name))
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to find animal: {}", e)))?
            .map(Animal::try_from)
            .transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Animal>> {
        AnimalEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get animal: {}", e)))?
            .map(Animal::try_from)
            .transpose()
    }

    async fn list(&self, filter: &AnimalFilter) -> AppResult<Vec<Animal>> {
        use sea_orm::sea_query::Expr;

        let mut select = AnimalEntity::find();

        if let Some(category) = filter.category {
            select = select.filter(animal::Column::Category.eq(category.as_str()));
        }

        if let Some(ref species) = filter.species {
            select = select.filter(Expr::cust_with_values(
                "LOWER(TRIM(species)) = LOWER($1)",
                [species.trim().to_string()],
            ));
        }

        select
            .order_by_asc(animal::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list animals: {}", e)))?
            .into_iter()
            .map(Animal::try_from)
            .collect()
    }

    async fn category_counts(&self) -> AppResult<Vec<CategoryCount>> {
        let rows: Vec<(String, i64)> = AnimalEntity::find()
            .select_only()
            .column(animal::Column::Category)
            .column_as(animal::Column::Id.count(), "count")
            .group_by(animal::Column::Category)
            .into_tuple()
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to count animals: {}", e)))?;

        let mut counts: HashMap<Category, u64> = HashMap::new();
        for (name, count) in rows {
            match Category::parse(&name) {
                Some(category) => {
                    counts.insert(category, count.max(0) as u64);
                }
                None => warn!("Ignoring animals with unknown category '{}'", name),
            }
        }

        Ok(Category::ALL
            .into_iter()
            .map(|category| CategoryCount {
                category,
                count: counts.get(&category).copied().unwrap_or(0),
            })
            .collect())
    }

    async fn append_upload(&self, upload: &AnimalUpload) -> AppResult<UpsertedAnimal> {
        if let Some(result) = self.try_append_upload(upload).await? {
            return Ok(result);
        }

        // Another upload created the record between our lookup and insert;
        // the row now exists, so the second attempt takes the locked-append path.
        info!(
            "Animal '{}' was created concurrently, appending instead",
            upload.name
        );
        self.try_append_upload(upload).await?.ok_or_else(|| {
            AppError::Database(format!(
                "Concurrent upload conflict for animal '{}'",
                upload.name
            ))
        })
    }

    async fn update(&self, id: Uuid, patch: &AnimalPatch) -> AppResult<Option<Animal>> {
        let Some(model) = AnimalEntity::find_by_id(id).one(self.connection()).await? else {
            return Ok(None);
        };

        let mut animal = Animal::try_from(model.clone())?;
        patch.apply(&mut animal);

        if animal.name.is_empty() {
            return Err(AppError::InvalidInput("Animal name cannot be empty".to_string()));
        }

        let mut active: ActiveModel = model.into();
        active.name = Set(animal.name.clone());
        active.species = Set(animal.species.clone());
        active.description = Set(animal.description.clone());
        active.location = Set(animal.location.clone());
        active.updated_at = Set(Utc::now());

        match active.update(self.connection()).await {
            Ok(_) => Ok(Some(animal)),
            Err(e) if is_unique_violation(&e) => Err(AppError::InvalidInput(format!(
                "An animal named '{}' already exists",
                animal.name
            ))),
            Err(e) => Err(AppError::Database(format!("Failed to update animal: {}", e))),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = AnimalEntity::delete_by_id(id)
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete animal: {}", e)))?;

        Ok(result.rows_affected > 0)
    }
}
