//! Ticket intake and history endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fusion_agent::runtime::SupportRuntime;
use fusion_core::domain::customer::CustomerId;
use fusion_core::domain::ticket::{DecisionResult, TicketPayload, TicketRecord};
use fusion_core::errors::{ApplicationError, InterfaceError};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct TicketState {
    runtime: Arc<SupportRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub correlation_id: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub customer_id: String,
    pub tickets: Vec<TicketRecord>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(runtime: Arc<SupportRuntime>) -> Router {
    Router::new()
        .route("/tickets", post(process_ticket))
        .route("/customers/{customer_id}/tickets", get(ticket_history))
        .with_state(TicketState { runtime })
}

pub async fn process_ticket(
    State(state): State<TicketState>,
    Json(payload): Json<TicketPayload>,
) -> Result<Json<DecisionResult>, ApiError> {
    state.runtime.process_ticket(payload).await.map(Json).map_err(api_error)
}

pub async fn ticket_history(
    Path(customer_id): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(state): State<TicketState>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let tickets = state
        .runtime
        .ticket_history(&CustomerId(customer_id.clone()), query.limit)
        .await
        .map_err(api_error)?;
    Ok(Json(HistoryResponse { customer_id, tickets }))
}

fn api_error(error: ApplicationError) -> ApiError {
    let correlation_id = Uuid::new_v4().to_string();
    let detail = error.to_string();
    let mapped = error.into_interface(correlation_id.clone());

    let status = match &mapped {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!(
            event_name = "http.tickets.failed",
            correlation_id = %correlation_id,
            error = %detail,
            "ticket request failed"
        );
    } else {
        warn!(
            event_name = "http.tickets.rejected",
            correlation_id = %correlation_id,
            error = %detail,
            "ticket request rejected"
        );
    }

    let body = ErrorBody { error: mapped.user_message().to_string(), detail, correlation_id };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::{Path, Query, State},
        http::{Request, StatusCode},
        Json,
    };
    use fusion_agent::runtime::{SupportRuntime, SupportSettings};
    use fusion_core::config::PersistPolicy;
    use fusion_core::domain::customer::{CustomerId, CustomerProfile};
    use fusion_core::domain::ticket::{Decision, Intent, TicketPayload};
    use fusion_core::events::InMemoryEventSink;
    use fusion_core::support::store::StaticProfileDirectory;
    use fusion_db::repositories::InMemoryTicketStore;
    use tower::ServiceExt;

    use super::{
        process_ticket, router, ticket_history, ErrorBody, HistoryQuery, HistoryResponse,
        TicketState,
    };

    fn runtime() -> Arc<SupportRuntime> {
        let profiles = StaticProfileDirectory::new([CustomerProfile {
            customer_id: CustomerId("1001".to_string()),
            segment: "premium".to_string(),
            name: Some("Ada Lovelace".to_string()),
            plan: Some("Pro".to_string()),
        }]);
        let settings =
            SupportSettings { persist_policy: PersistPolicy::All, ..SupportSettings::default() };
        Arc::new(
            SupportRuntime::new(
                Arc::new(profiles),
                Arc::new(InMemoryTicketStore::default()),
                Arc::new(InMemoryEventSink::default()),
            )
            .with_settings(settings),
        )
    }

    fn state(runtime: Arc<SupportRuntime>) -> State<TicketState> {
        State(TicketState { runtime })
    }

    #[tokio::test]
    async fn process_ticket_returns_decision_for_valid_payload() {
        let Json(result) = process_ticket(
            state(runtime()),
            Json(TicketPayload::new(11_i64, 1001_i64, "How do I reset password?")),
        )
        .await
        .expect("decision");

        assert_eq!(result.intent, Intent::Faq);
        assert_eq!(result.decision, Decision::AutoResolve);
        assert_eq!(result.customer_segment, "premium");
    }

    #[tokio::test]
    async fn process_ticket_maps_validation_failure_to_bad_request() {
        let result =
            process_ticket(state(runtime()), Json(TicketPayload::new("T-1", "1001", "   "))).await;

        let (status, Json(body)) = match result {
            Err(error) => error,
            Ok(_) => panic!("blank message must be rejected"),
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.detail.contains("message"));
        assert!(!body.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn history_lists_processed_tickets_newest_first() {
        let runtime = runtime();
        for (id, message) in [("T-1", "How do I reset password?"), ("T-2", "App crashes on startup")]
        {
            process_ticket(state(runtime.clone()), Json(TicketPayload::new(id, "1001", message)))
                .await
                .expect("decision");
        }

        let Json(HistoryResponse { customer_id, tickets }) = ticket_history(
            Path("1001".to_string()),
            Query(HistoryQuery { limit: Some(1) }),
            state(runtime),
        )
        .await
        .expect("history");

        assert_eq!(customer_id, "1001");
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].ticket_id.as_str(), "T-2");
    }

    #[tokio::test]
    async fn router_wires_ticket_intake_over_http() {
        let app = router(runtime());
        let request = Request::builder()
            .method("POST")
            .uri("/tickets")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"id": 12, "customer_id": 1002, "message": "My payment failed 3 times", "channel": "email"}"#,
            ))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["intent"], "billing");
        assert_eq!(body["decision"], "ESCALATE_HUMAN");
        assert_eq!(body["customer_segment"], "unknown");
    }

    #[tokio::test]
    async fn router_rejects_negative_sla_hours_with_error_body() {
        let app = router(runtime());
        let request = Request::builder()
            .method("POST")
            .uri("/tickets")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"id": 13, "customer_id": 1001, "message": "Where is my order?", "sla_hours": -1}"#,
            ))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        let body: ErrorBody = serde_json::from_slice(&bytes).expect("json");
        assert!(body.detail.contains("sla_hours"));
        assert!(!body.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn router_accepts_float_sla_hours() {
        let app = router(runtime());
        let request = Request::builder()
            .method("POST")
            .uri("/tickets")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"id": 14, "customer_id": 1001, "message": "Where is my order?", "sla_hours": 2.0}"#,
            ))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["priority"], "high");
    }

    #[tokio::test]
    async fn history_rejects_zero_limit() {
        let result = ticket_history(
            Path("1001".to_string()),
            Query(HistoryQuery { limit: Some(0) }),
            state(runtime()),
        )
        .await;

        let (status, Json(body)) = match result {
            Err(error) => error,
            Ok(_) => panic!("zero limit must be rejected"),
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.detail.contains("limit"));
    }

    #[tokio::test]
    async fn router_serves_history_with_default_limit() {
        let app = router(runtime());
        let request = Request::builder()
            .uri("/customers/404/tickets")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), 64 * 1024).await.expect("body");
        let body: HistoryResponse = serde_json::from_slice(&bytes).expect("json");
        assert!(body.tickets.is_empty());
    }
}
