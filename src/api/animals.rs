//! Gallery browsing and animal administration endpoints.

use actix_web::{HttpResponse, delete, get, put, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::db::AnimalStore;
use crate::error::{AppError, AppResult, ErrorResponse};
use crate::models::{
    Animal, AnimalFilter, AnimalPatch, Category, CategoryCount, SlideshowImage,
};

/// Configure animal routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_categories)
        .service(list_animals)
        .service(get_slideshow)
        .service(get_animal)
        .service(update_animal)
        .service(delete_animal);
}

/// Category counts response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryCount>,
}

/// Animal list response.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnimalListResponse {
    pub animals: Vec<Animal>,
}

/// Slideshow response.
#[derive(Debug, Serialize, ToSchema)]
pub struct SlideshowResponse {
    pub images: Vec<SlideshowImage>,
}

/// Animal list filters.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListAnimalsQuery {
    /// Restrict to one category (case-insensitive).
    pub category: Option<String>,
    /// Scientific name (case-insensitive).
    pub species: Option<String>,
    /// Exact animal name.
    pub name: Option<String>,
}

impl ListAnimalsQuery {
    fn filter(&self) -> AppResult<AnimalFilter> {
        let category = match self.category.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(
                Category::parse(raw)
                    .ok_or_else(|| AppError::InvalidInput(format!("Unknown category '{}'", raw)))?,
            ),
            _ => None,
        };
        let species = self
            .species
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(AnimalFilter { category, species })
    }
}

/// Count animals in every category.
///
/// GET /api/v1/categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Gallery",
    responses(
        (status = 200, description = "Counts for all categories", body = CategoriesResponse)
    )
)]
#[get("/categories")]
pub async fn list_categories(store: web::Data<dyn AnimalStore>) -> AppResult<HttpResponse> {
    let categories = store.category_counts().await?;
    Ok(HttpResponse::Ok().json(CategoriesResponse { categories }))
}

/// List animals, optionally by category, species or exact name.
///
/// GET /api/v1/animals
#[utoipa::path(
    get,
    path = "/api/v1/animals",
    tag = "Gallery",
    params(ListAnimalsQuery),
    responses(
        (status = 200, description = "Matching animals ordered by name", body = AnimalListResponse),
        (status = 400, description = "Unknown category", body = ErrorResponse)
    )
)]
#[get("/animals")]
pub async fn list_animals(
    query: web::Query<ListAnimalsQuery>,
    store: web::Data<dyn AnimalStore>,
) -> AppResult<HttpResponse> {
    let filter = query.filter()?;

    let animals = match query.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => store
            .find_by_name(name)
            .await?
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect(),
        _ => store.list(&filter).await?,
    };

    Ok(HttpResponse::Ok().json(AnimalListResponse { animals }))
}

/// Every image of every animal, shuffled.
///
/// GET /api/v1/gallery/slideshow
#[utoipa::path(
    get,
    path = "/api/v1/gallery/slideshow",
    tag = "Gallery",
    responses(
        (status = 200, description = "Shuffled slideshow images", body = SlideshowResponse)
    )
)]
#[get("/gallery/slideshow")]
pub async fn get_slideshow(store: web::Data<dyn AnimalStore>) -> AppResult<HttpResponse> {
    let animals = store.list(&AnimalFilter::default()).await?;
    Ok(HttpResponse::Ok().json(SlideshowResponse {
        images: shuffled_slideshow(&animals),
    }))
}

/// Get one animal.
///
/// GET /api/v1/animals/{id}
#[utoipa::path(
    get,
    path = "/api/v1/animals/{id}",
    tag = "Gallery",
    params(
        ("id" = String, Path, description = "Animal UUID")
    ),
    responses(
        (status = 200, description = "The animal", body = Animal),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Animal not found", body = ErrorResponse)
    )
)]
#[get("/animals/{id}")]
pub async fn get_animal(
    path: web::Path<String>,
    store: web::Data<dyn AnimalStore>,
) -> AppResult<HttpResponse> {
    let id = parse_animal_id(&path)?;
    let animal = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Animal".to_string()))?;

    Ok(HttpResponse::Ok().json(animal))
}

/// Edit an animal's name, species, description or location.
///
/// PUT /api/v1/animals/{id}
#[utoipa::path(
    put,
    path = "/api/v1/animals/{id}",
    tag = "Admin",
    params(
        ("id" = String, Path, description = "Animal UUID")
    ),
    request_body = AnimalPatch,
    responses(
        (status = 200, description = "Updated animal", body = Animal),
        (status = 400, description = "Invalid edit", body = ErrorResponse),
        (status = 401, description = "Admin session required", body = ErrorResponse),
        (status = 404, description = "Animal not found", body = ErrorResponse)
    ),
    security(
        ("session" = [])
    )
)]
#[put("/animals/{id}")]
pub async fn update_animal(
    admin: AdminSession,
    path: web::Path<String>,
    body: web::Json<AnimalPatch>,
    store: web::Data<dyn AnimalStore>,
) -> AppResult<HttpResponse> {
    let id = parse_animal_id(&path)?;
    if body.is_empty() {
        return Err(AppError::InvalidInput("No fields to update".to_string()));
    }
    body.validate()?;

    let animal = store
        .update(id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound("Animal".to_string()))?;

    info!("Animal {} updated by {}", id, admin.claims.email);
    Ok(HttpResponse::Ok().json(animal))
}

/// Delete an animal.
///
/// DELETE /api/v1/animals/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/animals/{id}",
    tag = "Admin",
    params(
        ("id" = String, Path, description = "Animal UUID")
    ),
    responses(
        (status = 200, description = "Animal deleted"),
        (status = 401, description = "Admin session required", body = ErrorResponse),
        (status = 404, description = "Animal not found", body = ErrorResponse)
    ),
    security(
        ("session" = [])
    )
)]
#[delete("/animals/{id}")]
pub async fn delete_animal(
    admin: AdminSession,
    path: web::Path<String>,
    store: web::Data<dyn AnimalStore>,
) -> AppResult<HttpResponse> {
    let id = parse_animal_id(&path)?;
    if !store.delete(id).await? {
        return Err(AppError::NotFound("Animal".to_string()));
    }

    info!("Animal {} deleted by {}", id, admin.claims.email);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Animal deleted successfully" })))
}

fn parse_animal_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidInput("Invalid animal ID".to_string()))
}

/// Flatten every image of every animal and shuffle the result.
pub fn shuffled_slideshow(animals: &[Animal]) -> Vec<SlideshowImage> {
    let mut images: Vec<SlideshowImage> = animals
        .iter()
        .flat_map(|animal| {
            animal.image_details.iter().map(|detail| SlideshowImage {
                path: detail.path.clone(),
                name: animal.name.clone(),
                id: animal.id,
                category: animal.category,
            })
        })
        .collect();

    images.sort_by_cached_key(|_| rand::random::<u64>());
    images
}
