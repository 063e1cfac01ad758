use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use fusion_core::domain::customer::CustomerId;
use fusion_core::domain::ticket::{DecisionResult, TicketId, TicketRecord};
use fusion_core::errors::ApplicationError;
use fusion_core::support::store::TicketStore;

use super::{decode_error, RepositoryError};
use crate::DbPool;

pub struct SqlTicketRepository {
    pool: DbPool,
}

impl SqlTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, record: &TicketRecord) -> Result<i64, RepositoryError> {
        let full_result = serde_json::to_string(&record.full_result).map_err(decode_error)?;

        let result = sqlx::query(
            "INSERT INTO ticket (ticket_id, customer_id, channel, message, intent, priority,
                                 status, created_at, resolved_at, full_result)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.ticket_id.as_str())
        .bind(record.customer_id.as_str())
        .bind(record.channel.as_str())
        .bind(&record.message)
        .bind(record.intent.as_str())
        .bind(record.priority.as_str())
        .bind(record.status.as_str())
        .bind(timestamp(&record.created_at))
        .bind(record.resolved_at.as_ref().map(timestamp))
        .bind(full_result)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn find_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<TicketRecord>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT ticket_id, customer_id, channel, message, intent, priority, status,
                    created_at, resolved_at, full_result
             FROM ticket
             WHERE customer_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )
        .bind(customer_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect::<Result<Vec<_>, _>>()
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ticket").fetch_one(&self.pool).await?;
        Ok(count)
    }
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)).map_err(decode_error)
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<TicketRecord, RepositoryError> {
    let ticket_id: String = row.try_get("ticket_id").map_err(decode_error)?;
    let customer_id: String = row.try_get("customer_id").map_err(decode_error)?;
    let channel: String = row.try_get("channel").map_err(decode_error)?;
    let message: String = row.try_get("message").map_err(decode_error)?;
    let intent: String = row.try_get("intent").map_err(decode_error)?;
    let priority: String = row.try_get("priority").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let resolved_at: Option<String> = row.try_get("resolved_at").map_err(decode_error)?;
    let full_result: String = row.try_get("full_result").map_err(decode_error)?;

    let full_result: DecisionResult = serde_json::from_str(&full_result).map_err(decode_error)?;

    Ok(TicketRecord {
        ticket_id: TicketId(ticket_id),
        customer_id: CustomerId(customer_id),
        channel: channel.parse().map_err(decode_error)?,
        message,
        intent: intent.parse().map_err(decode_error)?,
        priority: priority.parse().map_err(decode_error)?,
        status: status.parse().map_err(decode_error)?,
        created_at: parse_timestamp(&created_at)?,
        resolved_at: resolved_at.as_deref().map(parse_timestamp).transpose()?,
        full_result,
    })
}

#[async_trait]
impl TicketStore for SqlTicketRepository {
    async fn save_ticket(&self, record: TicketRecord) -> Result<(), ApplicationError> {
        self.insert(&record).await?;
        Ok(())
    }

    async fn list_tickets(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<TicketRecord>, ApplicationError> {
        Ok(self.find_for_customer(customer_id, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use fusion_core::domain::customer::CustomerId;
    use fusion_core::domain::ticket::{
        Decision, DecisionResult, EscalationReason, Intent, Priority, TicketPayload, TicketRecord,
        TicketStatus,
    };
    use fusion_core::support::store::TicketStore;

    use super::SqlTicketRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn record(ticket_id: &str, customer_id: &str, minutes: i64, decision: Decision) -> TicketRecord {
        let ticket = TicketPayload::new(ticket_id, customer_id, "My payment failed")
            .with_channel("email")
            .into_ticket()
            .expect("ticket");
        let escalation_reason =
            (decision == Decision::EscalateHuman).then_some(EscalationReason::HighPriority);
        let result = DecisionResult {
            ticket_id: ticket.id.clone(),
            intent: Intent::Billing,
            priority: Priority::High,
            decision,
            confidence: 0.9,
            response_text: "answer".to_string(),
            customer_segment: "premium".to_string(),
            escalation_reason,
            model_text: None,
        };
        let created_at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("timestamp")
            + Duration::minutes(minutes);
        TicketRecord::from_decision(&ticket, &result, created_at)
    }

    #[tokio::test]
    async fn saved_record_reads_back_with_full_result() {
        let repo = SqlTicketRepository::new(setup().await);
        let saved = record("T-1", "1001", 0, Decision::EscalateHuman);

        repo.save_ticket(saved.clone()).await.expect("save");
        let found = repo.list_tickets(&CustomerId("1001".to_string()), 10).await.expect("list");

        assert_eq!(found, vec![saved]);
        assert_eq!(found[0].status, TicketStatus::Escalated);
        assert_eq!(found[0].resolved_at, None);
    }

    #[tokio::test]
    async fn resolved_records_keep_resolution_time() {
        let repo = SqlTicketRepository::new(setup().await);
        let saved = record("T-2", "1001", 5, Decision::AutoResolve);

        repo.save_ticket(saved.clone()).await.expect("save");
        let found = repo.list_tickets(&CustomerId("1001".to_string()), 10).await.expect("list");

        assert_eq!(found[0].status, TicketStatus::Resolved);
        assert_eq!(found[0].resolved_at, Some(saved.created_at));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let repo = SqlTicketRepository::new(setup().await);
        repo.save_ticket(record("T-1", "1001", 0, Decision::EscalateHuman)).await.expect("save 1");
        repo.save_ticket(record("T-2", "1001", 10, Decision::EscalateHuman)).await.expect("save 2");
        repo.save_ticket(record("T-3", "1001", 5, Decision::EscalateHuman)).await.expect("save 3");
        repo.save_ticket(record("T-4", "1002", 20, Decision::EscalateHuman)).await.expect("save 4");

        let found = repo.list_tickets(&CustomerId("1001".to_string()), 2).await.expect("list");
        let ids: Vec<&str> = found.iter().map(|record| record.ticket_id.as_str()).collect();

        assert_eq!(ids, vec!["T-2", "T-3"]);
    }

    #[tokio::test]
    async fn equal_timestamps_fall_back_to_insertion_order() {
        let repo = SqlTicketRepository::new(setup().await);
        repo.save_ticket(record("T-1", "1001", 0, Decision::EscalateHuman)).await.expect("save 1");
        repo.save_ticket(record("T-2", "1001", 0, Decision::EscalateHuman)).await.expect("save 2");

        let found = repo.list_tickets(&CustomerId("1001".to_string()), 10).await.expect("list");
        let ids: Vec<&str> = found.iter().map(|record| record.ticket_id.as_str()).collect();

        assert_eq!(ids, vec!["T-2", "T-1"]);
        assert_eq!(repo.count().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn unknown_customer_has_empty_history() {
        let repo = SqlTicketRepository::new(setup().await);
        let found = repo.list_tickets(&CustomerId("9999".to_string()), 10).await.expect("list");
        assert!(found.is_empty());
    }
}
