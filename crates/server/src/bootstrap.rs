use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use fixbid_bus::{BroadcastHub, PushBus};
use fixbid_core::config::{AppConfig, ConfigError};
use fixbid_db::repositories::{
    SqlBookingRepository, SqlNotificationRepository, SqlProviderRepository, SqlQuoteRepository,
    SqlServiceCatalogRepository, SqlServiceRequestRepository, SqlWalletRepository,
};
use fixbid_db::{connect_with_settings, migrations, DbPool, WalletLedger};

use crate::workflow::RequestWorkflow;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub workflow: Arc<RequestWorkflow>,
    pub wallet_ledger: Arc<WalletLedger>,
    /// In-process seam to the external real-time layer; subscribers attach
    /// here.
    pub push_hub: Arc<BroadcastHub>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        database_url = %config.database.url,
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let push_hub = Arc::new(BroadcastHub::default());
    let bus: Arc<dyn PushBus> = push_hub.clone();

    let workflow = Arc::new(RequestWorkflow::new(
        config.workflow.clone(),
        Arc::new(SqlServiceRequestRepository::new(db_pool.clone())),
        Arc::new(SqlQuoteRepository::new(db_pool.clone())),
        Arc::new(SqlNotificationRepository::new(db_pool.clone())),
        Arc::new(SqlProviderRepository::new(db_pool.clone())),
        Arc::new(SqlBookingRepository::new(db_pool.clone())),
        Arc::new(SqlServiceCatalogRepository::new(db_pool.clone())),
        bus,
    ));

    let wallet_ledger =
        Arc::new(WalletLedger::new(Arc::new(SqlWalletRepository::new(db_pool.clone()))));

    Ok(Application { config, db_pool, workflow, wallet_ledger, push_hub })
}

#[cfg(test)]
mod tests {
    use fixbid_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use super::bootstrap_with_config;

    #[tokio::test]
    async fn bootstrap_applies_migrations_on_a_fresh_database() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some("does/not/exist.toml".into()),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("load config");

        let app = bootstrap_with_config(config).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
             AND name IN ('service_request', 'provider_quote', 'provider_notification', 'booking')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("query sqlite_master");

        assert_eq!(table_count, 4, "bootstrap should expose the workflow tables");
    }
}
