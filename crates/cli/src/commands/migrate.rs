use intake_db::migrations::MIGRATOR;

use crate::commands::{open_database, prepare, CommandResult, StepFailure};

const COMMAND: &str = "migrate";

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare(COMMAND) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        pool.close().await;
        Ok::<(), StepFailure>(())
    });

    match result {
        Ok(()) => {
            let known =
                MIGRATOR.iter().filter(|migration| !migration.migration_type.is_down_migration());
            CommandResult::success(
                COMMAND,
                format!("schema is current ({} migration(s) applied)", known.count()),
            )
        }
        Err(failure) => CommandResult::from_step(COMMAND, failure),
    }
}
