use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Demo customers used by local runs and the evaluation cases.
const SEED_PROFILES: &[SeedProfileContract] = &[
    SeedProfileContract {
        customer_id: "1001",
        segment: "premium",
        name: "Ada Lovelace",
        plan: "Pro",
    },
    SeedProfileContract {
        customer_id: "1002",
        segment: "standard",
        name: "Grace Hopper",
        plan: "Basic",
    },
    SeedProfileContract {
        customer_id: "1003",
        segment: "enterprise",
        name: "Katherine Johnson",
        plan: "Enterprise",
    },
];

pub struct SupportSeedDataset;

impl SupportSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/support_seed.sql");

    /// Idempotent: reloading updates the rows in place.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let profiles_seeded = SEED_PROFILES
            .iter()
            .map(|profile| ProfileSeedInfo {
                customer_id: profile.customer_id,
                segment: profile.segment,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { profiles_seeded })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for profile in SEED_PROFILES {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM customer_profile
                               WHERE customer_id = ?1 AND segment = ?2 AND name = ?3 AND plan = ?4)",
            )
            .bind(profile.customer_id)
            .bind(profile.segment)
            .bind(profile.name)
            .bind(profile.plan)
            .fetch_one(pool)
            .await?;
            checks.push((profile.customer_id, present == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    pub fn customer_ids() -> Vec<&'static str> {
        SEED_PROFILES.iter().map(|profile| profile.customer_id).collect()
    }
}

struct SeedProfileContract {
    customer_id: &'static str,
    segment: &'static str,
    name: &'static str,
    plan: &'static str,
}

#[derive(Debug)]
pub struct SeedResult {
    pub profiles_seeded: Vec<ProfileSeedInfo>,
}

#[derive(Debug)]
pub struct ProfileSeedInfo {
    pub customer_id: &'static str,
    pub segment: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
