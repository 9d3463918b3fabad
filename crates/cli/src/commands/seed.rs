use std::sync::Arc;

use intake_agent::{ListingError, ListingService, NoopNotifier};
use intake_db::demo_listings;
use intake_db::repositories::SqlPropertyRepository;

use crate::commands::{open_database, prepare, CommandResult, StepFailure};

const COMMAND: &str = "seed";

#[derive(Debug, Default, PartialEq, Eq)]
struct SeedSummary {
    created: Vec<String>,
    skipped: Vec<String>,
}

impl SeedSummary {
    fn message(&self) -> String {
        let mut message = format!(
            "demo listings: {} created, {} already present",
            self.created.len(),
            self.skipped.len()
        );
        if !self.created.is_empty() {
            message.push_str(&format!("\n  created: {}", self.created.join(", ")));
        }
        if !self.skipped.is_empty() {
            message.push_str(&format!("\n  skipped: {}", self.skipped.join(", ")));
        }
        message
    }
}

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare(COMMAND) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        // Demo data is never announced to the automation webhook.
        let listings = ListingService::new(
            Arc::new(SqlPropertyRepository::new(pool.clone())),
            Arc::new(NoopNotifier),
        );

        let summary = load_listings(&listings).await;
        pool.close().await;
        summary
    });

    match result {
        Ok(summary) => CommandResult::success(COMMAND, summary.message()),
        Err(failure) => CommandResult::from_step(COMMAND, failure),
    }
}

async fn load_listings(listings: &ListingService) -> Result<SeedSummary, StepFailure> {
    let mut summary = SeedSummary::default();

    for listing in demo_listings() {
        let identifier = listing.property_identifier.clone().unwrap_or_default();
        match listings.create(listing).await {
            Ok(property) => summary.created.push(property.property_identifier.0),
            Err(ListingError::DuplicateIdentifier(_)) => summary.skipped.push(identifier),
            Err(error) => return Err(("seed_execution", error.to_string(), 5u8)),
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use intake_agent::{ListingService, NoopNotifier};
    use intake_db::demo_listings;
    use intake_db::repositories::InMemoryPropertyRepository;

    use super::{load_listings, SeedSummary};

    #[tokio::test]
    async fn second_load_skips_every_listing() {
        let listings = ListingService::new(
            Arc::new(InMemoryPropertyRepository::default()),
            Arc::new(NoopNotifier),
        );

        let first = load_listings(&listings).await.expect("first load");
        let second = load_listings(&listings).await.expect("second load");

        assert_eq!(first.created.len(), demo_listings().len());
        assert!(first.skipped.is_empty());
        assert!(second.created.is_empty());
        assert_eq!(second.skipped, first.created);
    }

    #[test]
    fn message_lists_created_and_skipped_identifiers() {
        let summary = SeedSummary {
            created: vec!["47237".to_string()],
            skipped: vec!["58012".to_string(), "64421".to_string()],
        };

        assert_eq!(
            summary.message(),
            "demo listings: 1 created, 2 already present\n  created: 47237\n  skipped: 58012, 64421"
        );
    }
}
