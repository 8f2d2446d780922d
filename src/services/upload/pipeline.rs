//! Upload orchestration: validate, store and classify every image, then
//! merge the batch into the animal record.
//!
//! The record store is only touched after every image of the batch has been
//! stored and classified. A single failure aborts the whole batch.

use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::AnimalStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    AnimalUpload, Classification, ImageDetail, NO_DESCRIPTION, UNKNOWN_SPECIES, check_field_len,
};
use crate::services::classifier::Classifier;
use crate::services::storage::ObjectStore;

/// One uploaded file.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Client-supplied filename, used only as a storage key hint.
    pub filename: String,
    pub data: Vec<u8>,
}

/// A parsed upload request.
#[derive(Debug, Clone, Default)]
pub struct UploadSubmission {
    pub name: String,
    /// Scientific name supplied by the uploader.
    pub species: Option<String>,
    pub location: String,
    pub images: Vec<ImagePayload>,
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadOutcome {
    pub animal_id: Uuid,
    /// True when the upload created the animal.
    pub created: bool,
    pub images_added: usize,
}

/// Submission after validation; never empty.
struct ValidatedBatch {
    name: String,
    species_hint: Option<String>,
    location: String,
    images: Vec<ImagePayload>,
}

impl ValidatedBatch {
    fn from_submission(submission: UploadSubmission) -> AppResult<Self> {
        let name = submission.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::InvalidInput("Animal name is required".to_string()));
        }
        check_field_len("name", &name)?;
        let location = submission.location.trim().to_string();
        check_field_len("location", &location)?;

        let images: Vec<ImagePayload> = submission
            .images
            .into_iter()
            .filter(|image| !image.data.is_empty())
            .collect();
        if images.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one non-empty image is required".to_string(),
            ));
        }

        let species_hint = submission
            .species
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            name,
            species_hint,
            location,
            images,
        })
    }
}

/// Stored URL plus classification for one image.
struct ProcessedImage {
    url: String,
    classification: Classification,
}

/// Coordinates object storage, classification and the animal store.
pub struct UploadPipeline {
    storage: Arc<dyn ObjectStore>,
    classifier: Arc<dyn Classifier>,
    animals: Arc<dyn AnimalStore>,
    parallelism: usize,
}

impl UploadPipeline {
    /// `parallelism` bounds how many images of one batch are in flight.
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        classifier: Arc<dyn Classifier>,
        animals: Arc<dyn AnimalStore>,
        parallelism: usize,
    ) -> Self {
        Self {
            storage,
            classifier,
            animals,
            parallelism: parallelism.max(1),
        }
    }

    /// Run one upload batch to completion.
    ///
    /// Validation failures happen before any external call. Results keep the
    /// order of the submitted images regardless of completion order.
    pub async fn handle_upload(&self, submission: UploadSubmission) -> AppResult<UploadOutcome> {
        let batch = ValidatedBatch::from_submission(submission)?;
        let hint = batch.species_hint.as_deref();

        info!(
            "Processing upload for '{}': {} image(s)",
            batch.name,
            batch.images.len()
        );

        let processed: Vec<ProcessedImage> = stream::iter(batch.images)
            .map(|image| self.process_image(image, &batch.name, hint))
            .buffered(self.parallelism)
            .try_collect()
            .await
            .inspect_err(|e| warn!("Upload for '{}' aborted: {}", batch.name, e))?;

        let image_details: Vec<ImageDetail> = processed
            .iter()
            .map(|image| ImageDetail {
                path: image.url.clone(),
                species: resolve_species(&image.classification.species, hint),
                description: resolve_description(&image.classification.description),
            })
            .collect();

        let Some(first_image) = processed.first() else {
            return Err(AppError::InvalidInput(
                "At least one non-empty image is required".to_string(),
            ));
        };

        // Placeholders stay on the image details; the record keeps blanks so a
        // later upload can backfill them.
        let first = Classification {
            species: first_image.classification.species.trim().to_string(),
            category: first_image.classification.category,
            description: first_image.classification.description.trim().to_string(),
        };
        info!("Resolved '{}' to category {}", batch.name, first.category);

        let images_added = image_details.len();
        let upload = AnimalUpload {
            name: batch.name,
            location: batch.location,
            species_hint: batch.species_hint,
            first,
            image_details,
        };

        let upserted = self.animals.append_upload(&upload).await?;
        info!(
            "{} animal '{}' ({}) with {} image(s), {} total",
            if upserted.created { "Created" } else { "Appended to" },
            upserted.animal.name,
            upserted.animal.id,
            images_added,
            upserted.animal.images.len()
        );

        Ok(UploadOutcome {
            animal_id: upserted.animal.id,
            created: upserted.created,
            images_added,
        })
    }

    /// Store one image, then classify it by its public URL.
    async fn process_image(
        &self,
        image: ImagePayload,
        name: &str,
        hint: Option<&str>,
    ) -> AppResult<ProcessedImage> {
        let url = self.storage.store(image.data, &image.filename).await?;
        let classification = self
            .classifier
            .classify(&url, name, hint.unwrap_or(UNKNOWN_SPECIES))
            .await?;

        Ok(ProcessedImage {
            url,
            classification,
        })
    }
}

/// Classifier species, else the uploader's hint, else the placeholder.
fn resolve_species(classified: &str, hint: Option<&str>) -> String {
    let classified = classified.trim();
    if !classified.is_empty() {
        return classified.to_string();
    }
    hint.unwrap_or(UNKNOWN_SPECIES).to_string()
}

fn resolve_description(classified: &str) -> String {
    if classified.trim().is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        classified.to_string()
    }
}
