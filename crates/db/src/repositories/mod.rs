use async_trait::async_trait;
use thiserror::Error;

use fusion_core::domain::quality::DataQualityRun;
use fusion_core::errors::ApplicationError;

pub mod customer;
pub mod memory;
pub mod quality;
pub mod ticket;

pub use customer::SqlCustomerProfileRepository;
pub use memory::{InMemoryQualityRunRepository, InMemoryTicketStore};
pub use quality::SqlQualityRunRepository;
pub use ticket::SqlTicketRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

#[async_trait]
pub trait QualityRunRepository: Send + Sync {
    /// Returns the stored run with its assigned id.
    async fn record(&self, run: DataQualityRun) -> Result<DataQualityRun, RepositoryError>;

    /// Most recent first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<DataQualityRun>, RepositoryError>;
}

fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}
