use library_lending::{
    adapters::{
        jwt::JwtIdentityProvider,
        memory::LibraryStore,
        postgres::{PostgresCatalogStore, PostgresTransactionLedger, PostgresUserStore},
    },
    api::{handlers::AppState, router::create_router},
    application::ServiceDependencies,
    config::{AppConfig, StorageBackend},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_lending=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let identity_provider = Arc::new(JwtIdentityProvider::new(
        &config.auth.jwt_secret,
        chrono::Duration::hours(config.auth.jwt_expiration_hours),
    ));

    let service_deps = match config.storage {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database");

            // Initialize database connection pool
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(&config.database.url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            ServiceDependencies {
                catalog_store: Arc::new(PostgresCatalogStore::new(pool.clone())),
                transaction_ledger: Arc::new(PostgresTransactionLedger::new(pool.clone())),
                user_store: Arc::new(PostgresUserStore::new(pool)),
                identity_provider,
            }
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");

            let store = Arc::new(LibraryStore::new());
            ServiceDependencies {
                catalog_store: store.clone(),
                transaction_ledger: store.clone(),
                user_store: store,
                identity_provider,
            }
        }
    };

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
