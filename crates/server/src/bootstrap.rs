use devis_core::config::{AppConfig, ConfigError, LoadOptions};
use devis_db::{connect_with_settings, migrations, DbPool, SeedCatalog};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("seed catalog load failed: {0}")]
    Seed(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Bring the application up from an already-loaded configuration: connect,
/// migrate, and seed the catalog when the database is empty.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        url = %config.database.url,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        "database migrations applied"
    );

    match SeedCatalog::load_if_empty(&db_pool)
        .await
        .map_err(|e| BootstrapError::Seed(e.to_string()))?
    {
        Some(report) => info!(
            event_name = "system.bootstrap.catalog_seeded",
            materials = report.materials,
            labor_entries = report.labor_entries,
            templates = report.templates,
            "seed catalog loaded into empty database"
        ),
        None => info!(
            event_name = "system.bootstrap.catalog_present",
            "catalog already populated, seed skipped"
        ),
    }

    Ok(Application { config, db_pool })
}
