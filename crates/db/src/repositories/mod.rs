use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use intake_core::domain::customer::{Customer, CustomerId};
use intake_core::domain::interaction::{Interaction, InteractionKind};
use intake_core::domain::property::{PriceBand, Property, PropertyId};

pub mod customer;
pub mod interaction;
pub mod memory;
pub mod property;

pub use customer::SqlCustomerRepository;
pub use interaction::SqlInteractionRepository;
pub use memory::{
    InMemoryCustomerRepository, InMemoryInteractionRepository, InMemoryPropertyRepository,
};
pub use property::SqlPropertyRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Customer>, RepositoryError>;
    async fn save(&self, customer: Customer) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn find_by_id(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Property>, RepositoryError>;

    /// Stores a new listing. Fails with [`RepositoryError::Conflict`] when the
    /// human-facing identifier is already taken.
    async fn insert(&self, property: Property) -> Result<(), RepositoryError>;

    /// Updates an existing listing. The stored identifier is left untouched.
    async fn save(&self, property: Property) -> Result<(), RepositoryError>;

    /// Every listing, newest first.
    async fn list_recent(&self) -> Result<Vec<Property>, RepositoryError>;

    /// Available listings in `[lower, budget)` by price descending, then
    /// `(budget, upper]` by price ascending, each side capped at `per_side`.
    async fn recommend(
        &self,
        band: &PriceBand,
        per_side: u32,
    ) -> Result<Vec<Property>, RepositoryError>;
}

#[async_trait]
pub trait InteractionRepository: Send + Sync {
    async fn append(&self, interaction: Interaction) -> Result<(), RepositoryError>;
    async fn latest_for_customer(
        &self,
        customer_id: &CustomerId,
        kind: InteractionKind,
    ) -> Result<Option<Interaction>, RepositoryError>;
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Interaction>, RepositoryError>;
}

/// Fixed-width UTC timestamps so lexical order in SQLite matches time order.
pub(crate) fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {e}")))
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
