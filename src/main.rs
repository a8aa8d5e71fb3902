use medcast_directory::{
    AppState, bootstrap,
    config::{AppConfig, Dialect, Env},
    create_router,
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
    storage::{LocalDiskStorage, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, datastore, storage, startup provisioning, then
/// the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast in production)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "medcast_directory=debug,tower_http=info,sqlx=warn".into());

    match config.env {
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        Env::Development | Env::Test => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Datastore
    let repo: RepositoryState = match config.dialect {
        Dialect::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(&config.db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("FATAL: Database migrations failed.");
            tracing::info!("database connected and migrated");

            Arc::new(PostgresRepository::new(pool))
        }
        Dialect::Memory => {
            tracing::warn!("DB_DIALECT=memory: data lives only as long as this process");
            Arc::new(InMemoryRepository::new())
        }
    };

    // 4. Upload storage
    let disk = LocalDiskStorage::new(&config.upload.path, config.upload.max_file_size);
    disk.ensure_root_exists()
        .await
        .expect("FATAL: Upload directory is not writable. Check UPLOAD_PATH.");
    let storage = Arc::new(disk) as StorageState;

    // 5. Startup provisioning
    bootstrap::run(repo.as_ref(), &config)
        .await
        .expect("FATAL: Startup provisioning failed.");

    tracing::info!(
        window_ms = config.rate_limit.window.as_millis() as u64,
        max_requests = config.rate_limit.max_requests,
        "rate limit configured for the fronting proxy"
    );

    // 6. Router and Server Startup
    let port = config.port;
    let app = create_router(AppState {
        repo,
        storage,
        config,
    });

    let address = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&address)
        .await
        .expect("FATAL: Could not bind the HTTP port.");

    tracing::info!("Listening on {}", address);
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui", port);

    axum::serve(listener, app).await.expect("HTTP server terminated");
}
