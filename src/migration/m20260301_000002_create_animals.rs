//! Migration: Create animals table.
//!
//! One row per animal name. Images live in two parallel JSONB arrays.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE animals (
                    id UUID PRIMARY KEY,
                    name VARCHAR(255) NOT NULL,
                    species TEXT NOT NULL DEFAULT '',
                    description TEXT NOT NULL DEFAULT '',
                    category VARCHAR(20) NOT NULL
                        CHECK (category IN (
                            'Arthropods', 'Mollusks', 'Worms', 'Cnidarians',
                            'Echinoderms', 'Sponges', 'Fish', 'Birds',
                            'Reptiles', 'Amphibians', 'Mammals'
                        )),
                    location VARCHAR(255) NOT NULL DEFAULT '',

                    -- [{path, species, description}, ...] in upload order
                    image_details JSONB NOT NULL DEFAULT '[]'::jsonb,
                    -- [path, ...] parallel to image_details
                    images JSONB NOT NULL DEFAULT '[]'::jsonb,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    CHECK (jsonb_array_length(image_details) = jsonb_array_length(images))
                );

                -- Name is the upsert key (exact, case-sensitive)
                CREATE UNIQUE INDEX idx_animals_name ON animals(name);

                -- Category browsing
                CREATE INDEX idx_animals_category ON animals(category);

                -- Species browsing (case-insensitive)
                CREATE INDEX idx_animals_species ON animals(LOWER(TRIM(species)));

                CREATE TRIGGER update_animals_updated_at
                    BEFORE UPDATE ON animals
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS update_animals_updated_at ON animals;
                DROP TABLE IF EXISTS animals CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
