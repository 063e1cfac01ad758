use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::customer::{CustomerId, CustomerProfile};
use crate::domain::ticket::TicketRecord;
use crate::errors::ApplicationError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no customer profile for `{0}`")]
    NotFound(CustomerId),
    #[error("customer directory unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_profile(&self, customer_id: &CustomerId) -> Result<CustomerProfile, LookupError>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Durable once this returns `Ok`.
    async fn save_ticket(&self, record: TicketRecord) -> Result<(), ApplicationError>;

    /// Most recent first.
    async fn list_tickets(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<TicketRecord>, ApplicationError>;
}

/// Read-only reference data held in memory.
#[derive(Clone, Debug, Default)]
pub struct StaticProfileDirectory {
    profiles: HashMap<CustomerId, CustomerProfile>,
}

impl StaticProfileDirectory {
    pub fn new(profiles: impl IntoIterator<Item = CustomerProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.customer_id.clone(), profile))
                .collect(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ApplicationError> {
        let raw = fs::read_to_string(path).map_err(|error| {
            ApplicationError::Configuration(format!(
                "could not read customer profiles `{}`: {error}",
                path.display()
            ))
        })?;
        let profiles: Vec<CustomerProfile> = serde_json::from_str(&raw).map_err(|error| {
            ApplicationError::Configuration(format!(
                "could not parse customer profiles `{}`: {error}",
                path.display()
            ))
        })?;
        Ok(Self::new(profiles))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileDirectory for StaticProfileDirectory {
    async fn get_profile(&self, customer_id: &CustomerId) -> Result<CustomerProfile, LookupError> {
        self.profiles
            .get(customer_id)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(customer_id.clone()))
    }
}
