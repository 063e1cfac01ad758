use fusion_db::fixtures::ProfileSeedInfo;
use fusion_db::SupportSeedDataset;

use crate::commands::support::{block_on, load_config, open_database};
use crate::commands::{CommandFailure, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("seed", failure),
    };

    let result = block_on(async {
        let pool = open_database(&config).await?;

        let seed_result = SupportSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = SupportSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let failed_checks = verification
            .checks
            .iter()
            .filter_map(|(check, passed)| (!passed).then_some(*check))
            .collect::<Vec<_>>();

        pool.close().await;
        let outcome: Result<Vec<ProfileSeedInfo>, CommandFailure> = if verification.all_present {
            Ok(seed_result.profiles_seeded)
        } else {
            Err(("seed_verification", verification_message(&failed_checks), 6u8))
        };
        outcome
    });

    match result {
        Ok(profiles) => CommandResult::success("seed", seed_message(&profiles)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn seed_message(profiles: &[ProfileSeedInfo]) -> String {
    let lines = profiles
        .iter()
        .map(|profile| format!("  - {}: {}", profile.customer_id, profile.segment))
        .collect::<Vec<_>>();
    format!(
        "support seed dataset loaded {} customer profiles:\n{}",
        profiles.len(),
        lines.join("\n")
    )
}

fn verification_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "some seed data failed to load".to_string()
    } else {
        format!("seed verification failed for customers: {}", failed_checks.join(", "))
    }
}
