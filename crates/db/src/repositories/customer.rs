use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;

use intake_core::domain::customer::{Customer, CustomerId, Preferences};

use super::{
    decode_timestamp, encode_timestamp, is_unique_violation, CustomerRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let phone_number: String =
        row.try_get("phone_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: Option<String> =
        row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let budget_str: Option<String> =
        row.try_get("budget").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let preferences_json: String =
        row.try_get("preferences_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let budget = budget_str
        .map(|raw| {
            Decimal::from_str(&raw)
                .map_err(|e| RepositoryError::Decode(format!("invalid budget `{raw}`: {e}")))
        })
        .transpose()?;
    let preferences: Preferences = serde_json::from_str(&preferences_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid preferences: {e}")))?;

    Ok(Customer {
        id: CustomerId(id),
        phone_number,
        name,
        budget,
        preferences,
        created_at: decode_timestamp(&created_at_str)?,
    })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, phone_number, name, budget, preferences_json, created_at
             FROM customer WHERE phone_number = ?",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_customer(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        let preferences_json = serde_json::to_string(&customer.preferences)
            .map_err(|e| RepositoryError::Decode(format!("encode preferences: {e}")))?;

        let result = sqlx::query(
            "INSERT INTO customer (id, phone_number, name, budget, preferences_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 budget = excluded.budget,
                 preferences_json = excluded.preferences_json",
        )
        .bind(&customer.id.0)
        .bind(&customer.phone_number)
        .bind(&customer.name)
        .bind(customer.budget.map(|value| value.to_string()))
        .bind(preferences_json)
        .bind(encode_timestamp(&customer.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) if is_unique_violation(&error) => Err(RepositoryError::Conflict(format!(
                "phone number `{}` belongs to another customer",
                customer.phone_number
            ))),
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use intake_core::domain::customer::{Customer, PREFERENCE_BEDROOMS, PREFERENCE_LOCATION};

    use super::SqlCustomerRepository;
    use crate::repositories::{CustomerRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn save_and_find_by_phone() {
        let repo = SqlCustomerRepository::new(setup().await);
        let mut customer = Customer::new("2348012345678");
        customer.merge_preference(PREFERENCE_LOCATION, json!("Lekki"));

        repo.save(customer.clone()).await.expect("save");
        let found = repo.find_by_phone("2348012345678").await.expect("find").expect("exists");

        assert_eq!(found.id, customer.id);
        assert_eq!(found.budget, None);
        assert_eq!(found.preferences.get(PREFERENCE_LOCATION), Some(&json!("Lekki")));
    }

    #[tokio::test]
    async fn unknown_phone_is_none() {
        let repo = SqlCustomerRepository::new(setup().await);
        let found = repo.find_by_phone("2340000000000").await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn save_upserts_budget_and_preferences() {
        let repo = SqlCustomerRepository::new(setup().await);
        let customer = Customer::new("2348012345678");
        repo.save(customer.clone()).await.expect("save");

        let mut updated = customer;
        updated.budget = Some(Decimal::new(250_000_50, 2));
        updated.merge_preference(PREFERENCE_BEDROOMS, json!(3));
        repo.save(updated).await.expect("upsert");

        let found = repo.find_by_phone("2348012345678").await.expect("find").expect("exists");
        assert_eq!(found.budget, Some(Decimal::new(250_000_50, 2)));
        assert_eq!(found.preferences.get(PREFERENCE_BEDROOMS), Some(&json!(3)));
    }

    #[tokio::test]
    async fn phone_number_is_unique() {
        let repo = SqlCustomerRepository::new(setup().await);
        repo.save(Customer::new("2348012345678")).await.expect("first save");

        let duplicate = repo.save(Customer::new("2348012345678")).await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));
    }
}
