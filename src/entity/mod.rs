//! SeaORM entity definitions for PostgreSQL database.

pub mod admin;
pub mod animal;
