use fusion_agent::evaluation::{default_gold_cases, evaluate_support};

use crate::commands::process::processing_failure;
use crate::commands::support::{block_on, load_config, open_database, support_runtime, to_data};
use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("evaluate", failure),
    };

    let result = block_on(async {
        let pool = open_database(&config).await?;
        let runtime = support_runtime(&config, pool.clone())?;
        let report =
            evaluate_support(&runtime, &default_gold_cases()).await.map_err(processing_failure);
        pool.close().await;
        report
    });

    match result {
        Ok(report) => CommandResult::success_with_data(
            "evaluate",
            format!(
                "evaluated {} gold tickets: accuracy {:.2}, macro f1 {:.2}",
                report.test_tickets, report.accuracy, report.macro_avg.f1_score
            ),
            to_data(&report),
        ),
        Err(failure) => CommandResult::from_failure("evaluate", failure),
    }
}
