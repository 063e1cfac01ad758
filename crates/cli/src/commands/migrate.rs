use crate::commands::support::{block_on, load_config, open_database};
use crate::commands::{CommandFailure, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(failure) => return CommandResult::from_failure("migrate", failure),
    };

    let result = block_on(async {
        let pool = open_database(&config).await?;
        pool.close().await;
        Ok::<(), CommandFailure>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
