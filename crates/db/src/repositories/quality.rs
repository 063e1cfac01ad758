use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use fusion_core::domain::quality::DataQualityRun;

use super::{decode_error, QualityRunRepository, RepositoryError};
use crate::DbPool;

pub struct SqlQualityRunRepository {
    pool: DbPool,
}

impl SqlQualityRunRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_run(row: &sqlx::sqlite::SqliteRow) -> Result<DataQualityRun, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(decode_error)?;
    let dataset_name: String = row.try_get("dataset_name").map_err(decode_error)?;
    let uploaded_by: String = row.try_get("uploaded_by").map_err(decode_error)?;
    let uploaded_at: String = row.try_get("uploaded_at").map_err(decode_error)?;
    let row_count: i64 = row.try_get("row_count").map_err(decode_error)?;
    let issue_count: i64 = row.try_get("issue_count").map_err(decode_error)?;
    let score: f64 = row.try_get("score").map_err(decode_error)?;
    let result: String = row.try_get("result").map_err(decode_error)?;

    let uploaded_at = DateTime::parse_from_rfc3339(&uploaded_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(decode_error)?;

    Ok(DataQualityRun {
        id: Some(id),
        dataset_name,
        uploaded_by,
        uploaded_at,
        row_count,
        issue_count,
        score,
        result: serde_json::from_str(&result).map_err(decode_error)?,
    })
}

#[async_trait]
impl QualityRunRepository for SqlQualityRunRepository {
    async fn record(&self, run: DataQualityRun) -> Result<DataQualityRun, RepositoryError> {
        let result = serde_json::to_string(&run.result).map_err(decode_error)?;

        let inserted = sqlx::query(
            "INSERT INTO data_quality_run (dataset_name, uploaded_by, uploaded_at, row_count,
                                           issue_count, score, result)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&run.dataset_name)
        .bind(&run.uploaded_by)
        .bind(run.uploaded_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .bind(run.row_count)
        .bind(run.issue_count)
        .bind(run.score)
        .bind(result)
        .execute(&self.pool)
        .await?;

        Ok(DataQualityRun { id: Some(inserted.last_insert_rowid()), ..run })
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<DataQualityRun>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, dataset_name, uploaded_by, uploaded_at, row_count, issue_count, score,
                    result
             FROM data_quality_run
             ORDER BY uploaded_at DESC, id DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_run).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use fusion_core::domain::quality::DataQualityRun;
    use fusion_core::domain::ticket::TicketPayload;
    use fusion_core::quality::assess_payloads;

    use super::SqlQualityRunRepository;
    use crate::repositories::QualityRunRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn recorded_run_gets_an_id_and_lists_back() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlQualityRunRepository::new(pool);

        let assessment = assess_payloads(&[
            TicketPayload::new("T-1", "1001", "a").with_channel("chat").with_sla_hours(4),
            TicketPayload::new("T-2", "1002", "b").with_channel("chat"),
        ]);
        let run = DataQualityRun::from_assessment("tickets.json", "cli", &assessment, Utc::now());

        let stored = repo.record(run).await.expect("record");
        assert!(stored.id.is_some());

        let runs = repo.list_recent(5).await.expect("list");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].row_count, 2);
        assert_eq!(runs[0].issue_count, 1);
        assert_eq!(runs[0].score, 0.5);
        assert_eq!(runs[0].result, stored.result);
    }
}
