//! API endpoint modules.

pub mod animals;
pub mod health;
pub mod openapi;

pub use animals::configure_routes as configure_animal_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
