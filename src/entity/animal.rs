//! Animal entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "animals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub species: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: String,
    pub location: String,
    /// Array of `{path, species, description}` objects.
    #[sea_orm(column_type = "JsonBinary")]
    pub image_details: JsonValue,
    /// Array of image URLs, parallel to `image_details`.
    #[sea_orm(column_type = "JsonBinary")]
    pub images: JsonValue,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
