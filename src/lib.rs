//! Wildlife gallery server library.
//!
//! Photo upload pipeline (object storage, image classification, animal
//! record upsert), gallery queries and administrator sessions.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
