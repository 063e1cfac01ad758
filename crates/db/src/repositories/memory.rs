use async_trait::async_trait;
use tokio::sync::RwLock;

use fusion_core::domain::customer::CustomerId;
use fusion_core::domain::quality::DataQualityRun;
use fusion_core::domain::ticket::TicketRecord;
use fusion_core::errors::ApplicationError;
use fusion_core::support::store::TicketStore;

use super::{QualityRunRepository, RepositoryError};

/// Ticket store for tests and database-less runs. Keeps insertion order.
#[derive(Default)]
pub struct InMemoryTicketStore {
    records: RwLock<Vec<TicketRecord>>,
}

impl InMemoryTicketStore {
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn records(&self) -> Vec<TicketRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn save_ticket(&self, record: TicketRecord) -> Result<(), ApplicationError> {
        let mut records = self.records.write().await;
        records.push(record);
        Ok(())
    }

    async fn list_tickets(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<TicketRecord>, ApplicationError> {
        let records = self.records.read().await;
        let mut matching: Vec<(usize, &TicketRecord)> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| &record.customer_id == customer_id)
            .collect();
        matching.sort_by(|(left_seq, left), (right_seq, right)| {
            right.created_at.cmp(&left.created_at).then(right_seq.cmp(left_seq))
        });

        Ok(matching.into_iter().take(limit as usize).map(|(_, record)| record.clone()).collect())
    }
}

#[derive(Default)]
pub struct InMemoryQualityRunRepository {
    runs: RwLock<Vec<DataQualityRun>>,
}

#[async_trait]
impl QualityRunRepository for InMemoryQualityRunRepository {
    async fn record(&self, run: DataQualityRun) -> Result<DataQualityRun, RepositoryError> {
        let mut runs = self.runs.write().await;
        let stored = DataQualityRun { id: Some(runs.len() as i64 + 1), ..run };
        runs.push(stored.clone());
        Ok(stored)
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<DataQualityRun>, RepositoryError> {
        let runs = self.runs.read().await;
        let mut recent = runs.clone();
        recent.sort_by(|left, right| {
            right.uploaded_at.cmp(&left.uploaded_at).then(right.id.cmp(&left.id))
        });
        recent.truncate(limit as usize);
        Ok(recent)
    }
}
