//! Wildlife gallery server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::http::header::{self, HeaderName};
use actix_web::{App, HttpRequest, HttpServer, Result as ActixResult, web};
use tokio::sync::Semaphore;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use wildlife_gallery_lib::api::{self, ApiDoc};
use wildlife_gallery_lib::auth::{AdminKey, SessionKeys};
use wildlife_gallery_lib::config::Config;
use wildlife_gallery_lib::db::{AnimalStore, DbPool};
use wildlife_gallery_lib::middleware::RequestLogger;
use wildlife_gallery_lib::services::{
    self, Classifier, ObjectStore, OpenAiClassifier, Storage, UploadLimits, UploadPipeline,
};

/// Static frontend directory, registered only when static serving is on.
#[derive(Clone)]
struct StaticDir(PathBuf);

/// SPA fallback handler - serves index.html for client-side routing.
async fn spa_fallback(req: HttpRequest) -> ActixResult<NamedFile> {
    let static_dir = req
        .app_data::<web::Data<StaticDir>>()
        .ok_or_else(|| actix_web::error::ErrorNotFound("Static files not configured"))?;
    Ok(NamedFile::open(static_dir.0.join("index.html"))?)
}

/// Perform health check (for Docker healthcheck).
async fn health_check() -> bool {
    Config::from_env().is_ok()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check().await { 0 } else { 1 });
    }

    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL, S3 credentials, WG_SESSION_SECRET");
            error!("    and OPENAI_API_KEY must be set and must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Wildlife Gallery Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = DbPool::shared(&config)
        .await
        .expect("Failed to initialize database");
    pool.run_migrations()
        .await
        .expect("Failed to run migrations");
    info!("Database migrations complete");

    let storage = Storage::new(&config.storage)
        .await
        .expect("Failed to initialize S3 storage");
    let classifier =
        OpenAiClassifier::new(&config.classifier).expect("Failed to initialize classifier");
    info!(
        "Classifier: model={}, timeout={}s",
        config.classifier.model, config.classifier.timeout_secs
    );

    let animal_store: Arc<dyn AnimalStore> = Arc::new(pool.clone());
    let object_store: Arc<dyn ObjectStore> = Arc::new(storage);
    let classifier: Arc<dyn Classifier> = Arc::new(classifier);

    // Prepare shared state
    let pipeline = web::Data::new(UploadPipeline::new(
        object_store,
        classifier,
        animal_store.clone(),
        config.upload_parallelism,
    ));
    let animal_store: web::Data<dyn AnimalStore> = web::Data::from(animal_store);
    let limits = web::Data::new(UploadLimits::from_config(&config));
    let session_keys = web::Data::new(SessionKeys::new(&config.session));
    let admin_key = web::Data::new(AdminKey::new(config.admin_key.clone()));
    let db_pool = web::Data::new(pool.clone());
    let shared_config = web::Data::new(config.clone());

    let bind_address = config.bind_address();
    let static_dir = config.static_dir.clone();
    let is_development = config.is_development();

    // Bounds memory usage: max_concurrent_uploads × max_upload_size
    let upload_semaphore = web::Data::new(Arc::new(Semaphore::new(config.max_concurrent_uploads)));
    info!(
        "Upload limits: {}MB max size, {} files, {} concurrent uploads, {} images in flight per upload",
        config.max_upload_size / 1024 / 1024,
        config.max_files_per_request,
        config.max_concurrent_uploads,
        config.upload_parallelism
    );

    if let Some(ref dir) = static_dir {
        info!("Static file serving enabled from {}", dir.display());
    }

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };
    info!("API docs at http://{}/api/docs/", bind_address);

    let server = HttpServer::new(move || {
        let allowed_headers = vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-admin-key"),
        ];

        let cors = if is_development {
            // Frontend dev server on another port; cookies must cross origins
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(allowed_headers)
                .supports_credentials()
                .max_age(3600)
        } else {
            // Same-origin only
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(allowed_headers)
                .max_age(3600)
        };

        let mut app = App::new()
            // CORS must wrap before other middleware
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(db_pool.clone())
            .app_data(animal_store.clone())
            .app_data(pipeline.clone())
            .app_data(limits.clone())
            .app_data(upload_semaphore.clone())
            .app_data(session_keys.clone())
            .app_data(admin_key.clone())
            .app_data(shared_config.clone())
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .service(
                web::scope("/api/v1")
                    .configure(api::configure_health_routes)
                    .configure(api::configure_animal_routes)
                    .configure(services::configure_upload_routes)
                    .configure(services::configure_auth_routes),
            )
            .service(
                SwaggerUi::new("/api/docs/{_:.*}").url("/api/openapi.json", ApiDoc::openapi()),
            );

        // Serve the built frontend when WG_STATIC_DIR is set
        if let Some(ref dir) = static_dir {
            app = app
                .app_data(web::Data::new(StaticDir(dir.clone())))
                .service(Files::new("/assets", dir.join("assets")).prefer_utf8(true))
                .service(Files::new("/favicon", dir.clone()).index_file("favicon.ico"))
                // SPA fallback - serve index.html for all other routes
                .default_service(web::route().to(spa_fallback));
        }

        app
    });

    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
