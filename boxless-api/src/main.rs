use actix_cors::Cors;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

mod config;
mod database;
mod handlers;
mod helpers;
mod integrations;
mod jobs;

use integrations::gmail::{GmailProviderFactory, MailProviderFactory};
use jobs::sync_manager::{QueueDispatch, SyncManager, SyncSettings};
use jobs::task_queue::HttpTaskBackend;

#[get("/")]
async fn hello() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Hello World"
    }))
}

#[get("/health")]
async fn health(db: web::Data<Arc<database::Database>>) -> impl Responder {
    // Test database connection
    match db.connection.lock() {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(_) => HttpResponse::InternalServerError().json(serde_json::json!({
            "status": "unhealthy",
            "database": "disconnected"
        })),
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long)]
    log_file_path: Option<String>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = args.log_file_path {
        let log_path = std::path::Path::new(&log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("boxless-api.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter.clone())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stdout),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // Initialize database
    let db = helpers::database::initialize_database().expect("Failed to initialize database");

    println!(
        "Database initialized at: {:?}",
        helpers::database::get_db_path().unwrap()
    );

    // Load config
    let (config, config_path) = config::ApiConfig::load().expect("Failed to load config");
    tracing::info!("Loaded config from {:?}", config_path);

    // Get server config or use defaults
    let (host, port) = if let Some(server_config) = &config.server {
        (server_config.host.clone(), server_config.port)
    } else {
        ("127.0.0.1".to_string(), 8080)
    };

    tracing::info!("Server will listen on {}:{}", host, port);

    let provider_factory: Arc<dyn MailProviderFactory> = Arc::new(GmailProviderFactory::new());

    // Queue mode is decided once at startup: with a [queue] section syncs go
    // through the durable task queue, otherwise they run inline
    let queue = config.queue.as_ref().map(|queue_config| {
        let sync_task_url = format!(
            "{}/tasks/sync-user",
            queue_config.callback_base_url.trim_end_matches('/')
        );
        tracing::info!("Task queue enabled, callbacks to {}", sync_task_url);
        QueueDispatch::new(
            Arc::new(HttpTaskBackend::new(queue_config.queue_url.clone())),
            sync_task_url,
        )
    });
    if queue.is_none() {
        tracing::info!("No task queue configured, syncs run inline");
    }

    let settings = SyncSettings {
        page_size: config.sync.page_size,
        max_messages_per_run: config.sync.max_messages_per_run,
        recency_days: config.sync.recency_days,
        page_delay: std::time::Duration::from_secs(config.sync.page_delay_secs),
        stagger_secs: config.sync.stagger_secs,
        status_retention_days: config.sync.status_retention_days,
    };
    let periodic_interval_secs = config.sync.periodic_interval_secs;
    let status_retention_days = config.sync.status_retention_days;

    let sync_manager = Arc::new(SyncManager::new(
        db.async_connection.clone(),
        provider_factory.clone(),
        queue,
        settings,
    ));

    // Spawn periodic sync-all dispatcher
    let manager_clone = sync_manager.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(periodic_interval_secs));
        // The immediate first tick doubles as the startup sync
        loop {
            interval.tick().await;
            if manager_clone.is_shutting_down() {
                break;
            }
            match manager_clone.sync_all_active_users().await {
                Ok(scheduled) => {
                    tracing::info!("Periodic sync dispatched for {} users", scheduled);
                }
                Err(e) => {
                    tracing::error!("Periodic sync dispatch failed: {}", e);
                }
            }
        }
    });

    // Spawn daily sync status retention sweep
    let cleanup_manager = sync_manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(86400));
        loop {
            interval.tick().await;
            if cleanup_manager.is_shutting_down() {
                break;
            }
            if let Err(e) = cleanup_manager
                .cleanup_old_sync_statuses(status_retention_days)
                .await
            {
                tracing::error!("Sync status cleanup failed: {}", e);
            }
        }
    });

    println!("Starting server on {}:{}", host, port);

    let sync_manager_for_server = sync_manager.clone();
    let server = HttpServer::new(move || {
        // Configure CORS
        let cors = if let Some(cors_config) = &config.cors {
            let mut cors_builder = Cors::default();
            for origin in &cors_config.allowed_origins {
                cors_builder = cors_builder.allowed_origin(origin);
            }
            cors_builder
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec!["Authorization", "Accept", "Content-Type"])
                .max_age(3600)
        } else {
            Cors::default()
                .allow_any_origin()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(vec!["Authorization", "Accept", "Content-Type"])
                .max_age(3600)
        };

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(sync_manager_for_server.clone()))
            .app_data(web::Data::new(provider_factory.clone()))
            .service(hello)
            .service(health)
            .route("/tasks/sync-user", web::post().to(handlers::sync::sync_user_task))
            .route("/tasks/sync-all-users", web::post().to(handlers::sync::sync_all_users))
            .route("/sync/status/{user_id}", web::get().to(handlers::sync::get_sync_status))
            .route("/api/users", web::post().to(handlers::users::create_user))
            .route("/api/users", web::get().to(handlers::users::list_users))
            .route("/api/users/{id}", web::get().to(handlers::users::get_user))
            .route("/api/users/{id}/labels", web::get().to(handlers::labels::list_labels))
            .route("/api/emails", web::get().to(handlers::emails::list_emails))
            .route("/api/emails/{id}", web::get().to(handlers::emails::get_email))
            .route("/api/emails/{id}/labels", web::get().to(handlers::emails::get_email_labels))
    })
    .bind((host.as_str(), port))?
    .run();

    let handle = server.handle();
    let shutdown_manager = sync_manager.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        tracing::info!("Ctrl+C received, shutting down...");
        shutdown_manager.shutdown();

        handle.stop(true).await;
    });

    server.await
}
