use std::sync::Arc;

use fusion_agent::llm::{HttpLlmClient, LlmClient};
use fusion_agent::runtime::{load_knowledge_base, SupportRuntime, SupportSettings};
use fusion_core::config::{AppConfig, ConfigError, LoadOptions};
use fusion_core::errors::ApplicationError;
use fusion_core::events::JsonlEventSink;
use fusion_core::support::store::{ProfileDirectory, StaticProfileDirectory};
use fusion_db::repositories::{SqlCustomerProfileRepository, SqlTicketRepository};
use fusion_db::{connect_with_config, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<SupportRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("support runtime setup failed: {0}")]
    Runtime(#[from] ApplicationError),
    #[error("llm client setup failed: {0}")]
    Llm(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let runtime = build_runtime(&config, db_pool.clone())?;
    info!(
        event_name = "system.bootstrap.runtime_ready",
        correlation_id = "bootstrap",
        persist_policy = config.support.persist_policy.as_str(),
        enrich_with_model = config.support.enrich_with_model,
        event_log = %config.support.event_log_path.display(),
        "support runtime initialized"
    );

    Ok(Application { config, db_pool, runtime: Arc::new(runtime) })
}

/// Assembles the runtime from config: SQL or file-backed profiles, SQL ticket store, JSONL
/// event log and the optional model client.
fn build_runtime(
    config: &AppConfig,
    db_pool: DbPool,
) -> Result<SupportRuntime, BootstrapError> {
    let profiles: Arc<dyn ProfileDirectory> = match &config.support.profiles_path {
        Some(path) => Arc::new(StaticProfileDirectory::from_json_file(path)?),
        None => Arc::new(SqlCustomerProfileRepository::new(db_pool.clone())),
    };
    let store = Arc::new(SqlTicketRepository::new(db_pool));
    let events = Arc::new(JsonlEventSink::new(config.support.event_log_path.clone()));

    let mut runtime = SupportRuntime::new(profiles, store, events)
        .with_knowledge_base(load_knowledge_base(&config.support)?)
        .with_settings(SupportSettings::from_config(config));

    if config.support.enrich_with_model {
        let client = HttpLlmClient::from_config(&config.llm)
            .map_err(|error| BootstrapError::Llm(error.to_string()))?;
        if let Some(client) = client {
            let client: Arc<dyn LlmClient> = Arc::new(client);
            runtime = runtime.with_llm(client);
        }
    }

    Ok(runtime)
}
