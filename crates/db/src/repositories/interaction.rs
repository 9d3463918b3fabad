use sqlx::Row;

use intake_core::domain::customer::CustomerId;
use intake_core::domain::interaction::{Interaction, InteractionId, InteractionKind};
use intake_core::domain::property::PropertyId;

use super::{decode_timestamp, encode_timestamp, InteractionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlInteractionRepository {
    pool: DbPool,
}

impl SqlInteractionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_interaction(row: &sqlx::sqlite::SqliteRow) -> Result<Interaction, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_id: String =
        row.try_get("customer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let property_id: Option<String> =
        row.try_get("property_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let kind_str: String =
        row.try_get("interaction_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let timestamp_str: String =
        row.try_get("timestamp").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let kind = kind_str
        .parse::<InteractionKind>()
        .map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Interaction {
        id: InteractionId(id),
        customer_id: CustomerId(customer_id),
        property_id: property_id.map(PropertyId),
        kind,
        notes,
        timestamp: decode_timestamp(&timestamp_str)?,
    })
}

#[async_trait::async_trait]
impl InteractionRepository for SqlInteractionRepository {
    async fn append(&self, interaction: Interaction) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO interaction (id, customer_id, property_id, interaction_type, notes, timestamp)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&interaction.id.0)
        .bind(&interaction.customer_id.0)
        .bind(interaction.property_id.as_ref().map(|id| id.0.as_str()))
        .bind(interaction.kind.as_str())
        .bind(&interaction.notes)
        .bind(encode_timestamp(&interaction.timestamp))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_for_customer(
        &self,
        customer_id: &CustomerId,
        kind: InteractionKind,
    ) -> Result<Option<Interaction>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, customer_id, property_id, interaction_type, notes, timestamp
             FROM interaction
             WHERE customer_id = ? AND interaction_type = ?
             ORDER BY timestamp DESC, rowid DESC
             LIMIT 1",
        )
        .bind(&customer_id.0)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_interaction(r)?)),
            None => Ok(None),
        }
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Interaction>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, customer_id, property_id, interaction_type, notes, timestamp
             FROM interaction
             WHERE customer_id = ?
             ORDER BY timestamp ASC, rowid ASC",
        )
        .bind(&customer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_interaction).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rand::{rngs::StdRng, SeedableRng};
    use rust_decimal::Decimal;

    use intake_core::domain::customer::{Customer, CustomerId};
    use intake_core::domain::interaction::{Interaction, InteractionKind};
    use intake_core::domain::property::NewProperty;

    use super::SqlInteractionRepository;
    use crate::repositories::{
        CustomerRepository, InteractionRepository, PropertyRepository, SqlCustomerRepository,
        SqlPropertyRepository,
    };
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    async fn insert_customer(pool: &sqlx::SqlitePool, phone: &str) -> Customer {
        let customer = Customer::new(phone);
        SqlCustomerRepository::new(pool.clone()).save(customer.clone()).await.expect("customer");
        customer
    }

    #[tokio::test]
    async fn latest_for_customer_filters_kind_and_orders_by_time() {
        let pool = setup().await;
        let customer = insert_customer(&pool, "2348011111111").await;
        let property = NewProperty {
            name: "Garden Flat".to_string(),
            description: "Two bed".to_string(),
            price: Decimal::new(90_000, 0),
            location: "Yaba".to_string(),
            bedrooms: 2,
            bathrooms: 1,
            is_available: true,
            image: None,
            image_urls: None,
            property_identifier: Some("55555".to_string()),
        }
        .into_property(&mut StdRng::seed_from_u64(3));
        SqlPropertyRepository::new(pool.clone()).insert(property.clone()).await.expect("property");

        let repo = SqlInteractionRepository::new(pool);
        let mut older =
            Interaction::record(customer.id.clone(), None, InteractionKind::Inquiry, None);
        older.timestamp = Utc::now() - Duration::minutes(5);
        let newer = Interaction::record(
            customer.id.clone(),
            Some(property.id.clone()),
            InteractionKind::Inquiry,
            Some("is property 55555 free?".to_string()),
        );
        let other_kind = Interaction::record(
            customer.id.clone(),
            None,
            InteractionKind::GeneralQuery,
            Some("hello".to_string()),
        );

        repo.append(older).await.expect("append older");
        repo.append(newer.clone()).await.expect("append newer");
        repo.append(other_kind).await.expect("append other");

        let latest = repo
            .latest_for_customer(&customer.id, InteractionKind::Inquiry)
            .await
            .expect("latest")
            .expect("exists");
        assert_eq!(latest.id, newer.id);
        assert_eq!(latest.property_id, Some(property.id));

        let history = repo.list_for_customer(&customer.id).await.expect("history");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].kind, InteractionKind::Inquiry);
    }

    #[tokio::test]
    async fn latest_for_customer_without_history_is_none() {
        let pool = setup().await;
        let customer = insert_customer(&pool, "2348022222222").await;
        let repo = SqlInteractionRepository::new(pool);

        let latest = repo
            .latest_for_customer(&customer.id, InteractionKind::PostInspection)
            .await
            .expect("latest");
        assert!(latest.is_none());
    }

    #[tokio::test]
    async fn interaction_requires_existing_customer() {
        let repo = SqlInteractionRepository::new(setup().await);
        let orphan = Interaction::record(
            CustomerId("CUS-missing".to_string()),
            None,
            InteractionKind::GeneralQuery,
            None,
        );

        assert!(repo.append(orphan).await.is_err());
    }
}
