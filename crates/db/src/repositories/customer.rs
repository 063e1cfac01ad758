use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::Row;

use fusion_core::domain::customer::{CustomerId, CustomerProfile};
use fusion_core::support::store::{LookupError, ProfileDirectory};

use super::{decode_error, RepositoryError};
use crate::DbPool;

/// Customer reference data stored next to the ticket table.
pub struct SqlCustomerProfileRepository {
    pool: DbPool,
}

impl SqlCustomerProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT customer_id, segment, name, plan FROM customer_profile WHERE customer_id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_profile(r)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, profile: &CustomerProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customer_profile (customer_id, segment, name, plan, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(customer_id) DO UPDATE SET
                 segment = excluded.segment,
                 name = excluded.name,
                 plan = excluded.plan,
                 updated_at = excluded.updated_at",
        )
        .bind(profile.customer_id.as_str())
        .bind(&profile.segment)
        .bind(&profile.name)
        .bind(&profile.plan)
        .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer_profile")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<CustomerProfile, RepositoryError> {
    let customer_id: String = row.try_get("customer_id").map_err(decode_error)?;
    let segment: String = row.try_get("segment").map_err(decode_error)?;
    let name: Option<String> = row.try_get("name").map_err(decode_error)?;
    let plan: Option<String> = row.try_get("plan").map_err(decode_error)?;

    Ok(CustomerProfile { customer_id: CustomerId(customer_id), segment, name, plan })
}

#[async_trait]
impl ProfileDirectory for SqlCustomerProfileRepository {
    async fn get_profile(&self, customer_id: &CustomerId) -> Result<CustomerProfile, LookupError> {
        match self.find_by_id(customer_id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => Err(LookupError::NotFound(customer_id.clone())),
            Err(error) => Err(LookupError::Unavailable(error.to_string())),
        }
    }
}
