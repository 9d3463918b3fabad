use intake_agent::{build_client, PromptLibrary};
use intake_whatsapp::CloudApiSender;

use crate::commands::{open_database, prepare, CommandResult, StepFailure};

const COMMAND: &str = "start";

/// Preflight for `intake-server`: everything the server builds at boot is
/// built here once and dropped.
pub fn run() -> CommandResult {
    let (config, runtime) = match prepare(COMMAND) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        pool.close().await;

        PromptLibrary::new().map_err(|error| ("prompt_templates", error.to_string(), 6u8))?;
        build_client(&config.llm).map_err(|error| ("llm_client", error.to_string(), 6u8))?;
        let sender = CloudApiSender::new(&config.whatsapp)
            .map_err(|error| ("messaging_client", error.to_string(), 6u8))?;

        Ok::<String, StepFailure>(sender.endpoint().to_string())
    });

    match result {
        Ok(endpoint) => CommandResult::success(
            COMMAND,
            format!(
                "preflight passed: database migrated, {:?} model `{}` ready, replies via {endpoint}; \
                 run `intake-server` to listen on {}:{}",
                config.llm.provider, config.llm.model, config.server.bind_address, config.server.port
            ),
        ),
        Err(failure) => CommandResult::from_step(COMMAND, failure),
    }
}
