use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use fusion_core::domain::quality::DataQualityRun;
use fusion_core::domain::ticket::TicketPayload;
use fusion_core::quality::assess_payloads;
use fusion_db::repositories::{QualityRunRepository, SqlQualityRunRepository};

use crate::commands::support::{block_on, load_config, open_database, to_data};
use crate::commands::CommandResult;

pub fn run(file: &Path, dataset: Option<&str>, uploaded_by: &str) -> CommandResult {
    let rows = match read_rows(file) {
        Ok(rows) => rows,
        Err(error) => {
            return CommandResult::failure("quality", "payload_read", format!("{error:#}"), 2);
        }
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("quality", failure),
    };

    let assessment = assess_payloads(&rows);
    let run = DataQualityRun::from_assessment(
        dataset_name(file, dataset),
        uploaded_by,
        &assessment,
        Utc::now(),
    );

    let result = block_on(async {
        let pool = open_database(&config).await?;
        let stored = SqlQualityRunRepository::new(pool.clone())
            .record(run)
            .await
            .map_err(|error| ("persistence", error.to_string(), 5u8));
        pool.close().await;
        stored
    });

    match result {
        Ok(stored) => CommandResult::success_with_data(
            "quality",
            format!(
                "dataset `{}`: {} rows, {} issue kinds, score {:.2}",
                stored.dataset_name, stored.row_count, stored.issue_count, stored.score
            ),
            to_data(&stored),
        ),
        Err(failure) => CommandResult::from_failure("quality", failure),
    }
}

fn read_rows(path: &Path) -> anyhow::Result<Vec<TicketPayload>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("dataset `{}` is not a JSON array of tickets", path.display()))
}

fn dataset_name(file: &Path, dataset: Option<&str>) -> String {
    dataset
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .or_else(|| file.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "unnamed".to_string())
}
