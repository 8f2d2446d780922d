//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models, services};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wildlife Gallery Server",
        version = "0.1.0",
        description = "Upload wildlife photographs, classify them and browse the gallery by category"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Gallery endpoints
        api::animals::list_categories,
        api::animals::list_animals,
        api::animals::get_slideshow,
        api::animals::get_animal,
        // Admin endpoints
        api::animals::update_animal,
        api::animals::delete_animal,
        services::upload::upload_animal,
        // Auth endpoints
        services::auth_admin::create_admin,
        services::auth_admin::login,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Gallery
            models::Category,
            models::ImageDetail,
            models::Animal,
            models::AnimalPatch,
            models::CategoryCount,
            models::SlideshowImage,
            api::animals::CategoriesResponse,
            api::animals::AnimalListResponse,
            api::animals::SlideshowResponse,
            // Upload
            services::upload::UploadResponse,
            // Auth
            models::AdminResponse,
            models::CreateAdminRequest,
            models::LoginRequest,
            services::auth_admin::LoginResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Gallery", description = "Public gallery browsing"),
        (name = "Upload", description = "Photo upload and classification"),
        (name = "Admin", description = "Animal administration"),
        (name = "Auth", description = "Administrator accounts and sessions")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add session and admin key security schemes.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::auth::SESSION_COOKIE,
                ))),
            );
            components.add_security_scheme(
                "admin_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    crate::config::ADMIN_KEY_HEADER,
                ))),
            );
        }
    }
}
