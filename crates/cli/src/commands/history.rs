use fusion_core::domain::customer::CustomerId;

use crate::commands::process::processing_failure;
use crate::commands::support::{block_on, load_config, open_database, support_runtime, to_data};
use crate::commands::CommandResult;

pub fn run(customer: &str, limit: Option<u32>) -> CommandResult {
    let customer_id = customer.trim();
    if customer_id.is_empty() {
        return CommandResult::failure("history", "validation", "customer id is required", 2);
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("history", failure),
    };

    let result = block_on(async {
        let pool = open_database(&config).await?;
        let runtime = support_runtime(&config, pool.clone())?;
        let tickets = runtime
            .ticket_history(&CustomerId(customer_id.to_string()), limit)
            .await
            .map_err(processing_failure);
        pool.close().await;
        tickets
    });

    match result {
        Ok(tickets) => CommandResult::success_with_data(
            "history",
            format!("{} tickets for customer {customer_id}", tickets.len()),
            to_data(&tickets),
        ),
        Err(failure) => CommandResult::from_failure("history", failure),
    }
}
