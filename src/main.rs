//! Sales forecast predict server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::path::PathBuf;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{App, HttpRequest, HttpServer, Result as ActixResult, http::header, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use forecast_predict_lib::api::{self, ApiDoc};
use forecast_predict_lib::config::{Config, USER_ID_HEADER};
use forecast_predict_lib::db::{DbPool, ForecastStore};
use forecast_predict_lib::middleware::RequestLogger;
use forecast_predict_lib::services::{ModelHandle, ResultStore};

/// Root of the bundled frontend build.
#[derive(Clone)]
struct StaticDir(PathBuf);

/// SPA fallback handler - serves index.html for client-side routing.
async fn spa_fallback(req: HttpRequest) -> ActixResult<NamedFile> {
    let dir = req
        .app_data::<web::Data<StaticDir>>()
        .ok_or_else(|| actix_web::error::ErrorNotFound("Static dir not configured"))?;
    Ok(NamedFile::open(dir.0.join("index.html"))?)
}

/// Perform health check (for Docker healthcheck).
fn health_check() -> bool {
    Config::from_env().is_ok()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Check for --health-check flag (used by Docker HEALTHCHECK)
    if std::env::args().any(|arg| arg == "--health-check") {
        dotenvy::dotenv().ok();
        std::process::exit(if health_check() { 0 } else { 1 });
    }

    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - PREDICT_UPLOADS_DIR and PREDICT_RESULTS_DIR must differ");
            error!("  - PREDICT_MAX_UPLOAD_SIZE must be a positive byte count");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Sales Forecast Predict Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let store = ResultStore::from_settings(&config.predict);
    store.ensure_dirs().await.map_err(std::io::Error::other)?;
    info!(
        "Storing uploads in {} and results in {}",
        config.predict.uploads_dir.display(),
        config.predict.results_dir.display()
    );

    let model = ModelHandle::load(&config.model_path);
    info!("Serving model: {}", model.source().as_str());

    let forecasts = match &config.forecast_db {
        Some(settings) => match DbPool::new(settings).await {
            Ok(pool) => {
                info!("Forecast database connection established");
                ForecastStore::new(Some(pool))
            }
            Err(e) => {
                warn!("Forecast feed disabled: {}", e);
                ForecastStore::disabled()
            }
        },
        None => {
            info!("FORECAST_DATABASE_URL not set; forecast feed disabled");
            ForecastStore::disabled()
        }
    };

    let bind_address = config.bind_address();
    let settings = config.predict.clone();
    let max_upload_size = settings.max_upload_size;
    let static_dir = config.static_dir.clone().map(StaticDir);
    let is_development = config.is_development();

    info!("Upload limit: {}MB", max_upload_size / 1024 / 1024);
    if let Some(dir) = &static_dir {
        info!("Static file serving enabled from {}", dir.0.display());
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

    let user_id_header = header::HeaderName::from_static(USER_ID_HEADER);

    let server = HttpServer::new(move || {
        let origins = if is_development {
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_origin("http://127.0.0.1:5173")
        } else {
            // Same-origin only
            Cors::default()
        };
        let cors = origins
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![
                header::ACCEPT,
                header::CONTENT_TYPE,
                user_id_header.clone(),
            ])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);

        let mut app = App::new()
            // CORS must wrap before other middleware
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(web::Data::new(model.clone()))
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(settings.clone()))
            .app_data(web::Data::new(forecasts.clone()))
            // Multipart overhead on top of the file itself; the file limit is enforced while streaming
            .app_data(web::PayloadConfig::new(max_upload_size * 2))
            .configure(api::configure_health_routes)
            .configure(api::configure_predict_routes)
            .configure(api::configure_forecast_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            );

        if let Some(dir) = &static_dir {
            app = app
                .app_data(web::Data::new(dir.clone()))
                .service(Files::new("/assets", dir.0.join("assets")).prefer_utf8(true))
                .service(Files::new("/favicon", dir.0.clone()).index_file("favicon.ico"))
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
