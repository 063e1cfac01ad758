//! Shared plumbing for commands that talk to the database or the support runtime.

use std::future::Future;
use std::sync::Arc;

use fusion_agent::llm::{HttpLlmClient, LlmClient};
use fusion_agent::runtime::{load_knowledge_base, SupportRuntime, SupportSettings};
use fusion_core::config::{AppConfig, LoadOptions};
use fusion_core::events::JsonlEventSink;
use fusion_core::support::store::{ProfileDirectory, StaticProfileDirectory};
use fusion_db::repositories::{SqlCustomerProfileRepository, SqlTicketRepository};
use fusion_db::{connect_with_config, migrations, DbPool};
use serde::Serialize;
use serde_json::Value;

use crate::commands::CommandFailure;

pub fn load_config() -> Result<AppConfig, CommandFailure> {
    AppConfig::load(LoadOptions::default())
        .map_err(|error| ("config_validation", format!("configuration issue: {error}"), 2u8))
}

pub fn block_on<T>(
    future: impl Future<Output = Result<T, CommandFailure>>,
) -> Result<T, CommandFailure> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| {
            ("runtime_init", format!("failed to initialize async runtime: {error}"), 3u8)
        })?;
    runtime.block_on(future)
}

/// Connects and applies pending migrations.
pub async fn open_database(config: &AppConfig) -> Result<DbPool, CommandFailure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

pub fn support_runtime(
    config: &AppConfig,
    pool: DbPool,
) -> Result<SupportRuntime, CommandFailure> {
    let profiles: Arc<dyn ProfileDirectory> = match &config.support.profiles_path {
        Some(path) => Arc::new(
            StaticProfileDirectory::from_json_file(path)
                .map_err(|error| ("runtime_setup", error.to_string(), 2u8))?,
        ),
        None => Arc::new(SqlCustomerProfileRepository::new(pool.clone())),
    };
    let knowledge_base = load_knowledge_base(&config.support)
        .map_err(|error| ("runtime_setup", error.to_string(), 2u8))?;

    let mut runtime = SupportRuntime::new(
        profiles,
        Arc::new(SqlTicketRepository::new(pool)),
        Arc::new(JsonlEventSink::new(config.support.event_log_path.clone())),
    )
    .with_knowledge_base(knowledge_base)
    .with_settings(SupportSettings::from_config(config));

    if config.support.enrich_with_model {
        if let Some(client) = HttpLlmClient::from_config(&config.llm)
            .map_err(|error| ("runtime_setup", error.to_string(), 2u8))?
        {
            let client: Arc<dyn LlmClient> = Arc::new(client);
            runtime = runtime.with_llm(client);
        }
    }

    Ok(runtime)
}

pub fn to_data(value: &impl Serialize) -> Option<Value> {
    serde_json::to_value(value).ok()
}
