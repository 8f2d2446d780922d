//! Photo upload intake.
//!
//! `POST /api/v1/animals/upload` accepts a multipart form with the text fields
//! `name`, `species` and `location` plus one or more `images` file fields.
//! The parsed submission is handed to [`UploadPipeline`].

mod pipeline;

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, post, web};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::config::Config;
use crate::error::{AppError, AppResult};

pub use pipeline::{ImagePayload, UploadOutcome, UploadPipeline, UploadSubmission};

/// Request limits for the upload endpoint.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Maximum total bytes read from one request.
    pub max_upload_size: usize,
    /// Maximum `images` fields per request.
    pub max_files_per_request: usize,
}

impl UploadLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_size: config.max_upload_size,
            max_files_per_request: config.max_files_per_request,
        }
    }
}

/// Upload response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub animal_id: Uuid,
    /// True when the upload created a new animal.
    pub created: bool,
    pub images_added: usize,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            success: true,
            animal_id: outcome.animal_id,
            created: outcome.created,
            images_added: outcome.images_added,
        }
    }
}

/// Configure upload routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_animal);
}

/// Upload photos of an animal.
///
/// POST /api/v1/animals/upload
/// Content-Type: multipart/form-data
#[utoipa::path(
    post,
    path = "/api/v1/animals/upload",
    tag = "Upload",
    request_body(content_type = "multipart/form-data", description = "Fields: name, species, location, images (repeatable)"),
    responses(
        (status = 200, description = "Images stored and merged into the animal", body = UploadResponse),
        (status = 400, description = "Missing name or images", body = crate::error::ErrorResponse),
        (status = 401, description = "Admin session required", body = crate::error::ErrorResponse),
        (status = 413, description = "Upload too large", body = crate::error::ErrorResponse),
        (status = 502, description = "Storage or classification failed", body = crate::error::ErrorResponse),
        (status = 503, description = "Too many concurrent uploads", body = crate::error::ErrorResponse)
    ),
    security(
        ("session" = [])
    )
)]
#[post("/animals/upload")]
pub async fn upload_animal(
    admin: AdminSession,
    mut payload: Multipart,
    pipeline: web::Data<UploadPipeline>,
    limits: web::Data<UploadLimits>,
    upload_semaphore: web::Data<Arc<Semaphore>>,
) -> AppResult<HttpResponse> {
    // Bounds memory: every admitted upload buffers its images.
    let _permit = upload_semaphore.try_acquire().map_err(|_| {
        warn!("Upload rejected: too many concurrent uploads");
        AppError::ServiceUnavailable(
            "Too many concurrent uploads. Please try again later.".to_string(),
        )
    })?;

    let submission = read_submission(&mut payload, limits.get_ref()).await?;
    info!(
        "Upload from {} for '{}' with {} file(s)",
        admin.claims.email,
        submission.name.trim(),
        submission.images.len()
    );

    let outcome = pipeline.handle_upload(submission).await?;

    Ok(HttpResponse::Ok().json(UploadResponse::from(outcome)))
}

/// Read the multipart body into a submission.
///
/// Repeated text fields keep their first value. Unknown fields are drained
/// and ignored.
async fn read_submission(
    payload: &mut Multipart,
    limits: &UploadLimits,
) -> AppResult<UploadSubmission> {
    let mut name: Option<String> = None;
    let mut species: Option<String> = None;
    let mut location: Option<String> = None;
    let mut images: Vec<ImagePayload> = Vec::new();
    let mut total_size: usize = 0;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::InvalidInput("Missing content disposition".to_string()))?;
        let field_name = content_disposition.get_name().unwrap_or_default().to_string();
        let filename = content_disposition.get_filename().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
            total_size += chunk.len();
            if total_size > limits.max_upload_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "Upload exceeds the {} byte limit",
                    limits.max_upload_size
                )));
            }
            data.extend_from_slice(&chunk);
        }

        match field_name.as_str() {
            "images" => {
                if images.len() >= limits.max_files_per_request {
                    return Err(AppError::InvalidInput(format!(
                        "Too many images: at most {} per upload",
                        limits.max_files_per_request
                    )));
                }
                images.push(ImagePayload {
                    filename: filename.unwrap_or_default(),
                    data,
                });
            }
            "name" => keep_first(&mut name, data, "name")?,
            "species" => keep_first(&mut species, data, "species")?,
            "location" => keep_first(&mut location, data, "location")?,
            other => debug!("Ignoring form field '{}'", other),
        }
    }

    Ok(UploadSubmission {
        name: name.unwrap_or_default(),
        species: species.filter(|s| !s.trim().is_empty()),
        location: location.unwrap_or_default(),
        images,
    })
}

/// Store a text field unless an earlier value already claimed the slot.
fn keep_first(slot: &mut Option<String>, data: Vec<u8>, field: &str) -> AppResult<()> {
    if slot.is_some() {
        return Ok(());
    }
    let text = String::from_utf8(data)
        .map_err(|_| AppError::InvalidInput(format!("Field '{}' must be UTF-8 text", field)))?;
    *slot = Some(text);
    Ok(())
}
