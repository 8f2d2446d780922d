//! Business logic services.

pub mod auth_admin;
pub mod classifier;
pub mod storage;
pub mod upload;

pub use auth_admin::configure_routes as configure_auth_routes;
pub use classifier::{Classifier, OpenAiClassifier};
pub use storage::{ObjectStore, Storage};
pub use upload::configure_routes as configure_upload_routes;
pub use upload::{UploadLimits, UploadPipeline};
