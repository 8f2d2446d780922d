//! Domain models for the wildlife gallery.

pub mod admin;
pub mod animal;

pub use admin::{Admin, AdminResponse, CreateAdminRequest, LoginRequest, SessionClaims};
pub use animal::{
    Animal, AnimalFilter, AnimalPatch, AnimalUpload, Category, CategoryCount, Classification, ImageDetail,
    MAX_FIELD_LEN, NO_DESCRIPTION, SlideshowImage, UNKNOWN_SPECIES, check_field_len,
};
