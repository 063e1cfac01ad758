use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use fusion_agent::runtime::SupportRuntime;
use fusion_db::repositories::SqlTicketRepository;
use fusion_db::DbPool;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    runtime: Arc<SupportRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, runtime: Arc<SupportRuntime>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, runtime })
}

/// Database readiness decides the status code; the service check only reports runtime settings.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";

    let settings = state.runtime.settings();
    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: format!(
                "fusion-server ready (persist_policy={}, model_enrichment={})",
                settings.persist_policy.as_str(),
                if settings.enrich_with_model { "on" } else { "off" }
            ),
        },
        database,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match SqlTicketRepository::new(pool.clone()).count().await {
        Ok(count) => HealthCheck { status: "ready", detail: format!("{count} tickets recorded") },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("ticket store query failed: {error}"),
        },
    }
}
