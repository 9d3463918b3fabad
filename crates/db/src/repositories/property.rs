use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::Row;

use intake_core::domain::property::{PriceBand, Property, PropertyId, PropertyIdentifier};

use super::{
    decode_timestamp, encode_timestamp, is_unique_violation, PropertyRepository, RepositoryError,
};
use crate::DbPool;

const PROPERTY_COLUMNS: &str = "id, property_identifier, name, description, price, location,
        bedrooms, bathrooms, is_available, image, image_urls_json, created_at";

pub struct SqlPropertyRepository {
    pool: DbPool,
}

impl SqlPropertyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_band_side(
        &self,
        predicate: &str,
        order: &str,
        low: f64,
        high: f64,
        limit: u32,
    ) -> Result<Vec<Property>, RepositoryError> {
        let sql = format!(
            "SELECT {PROPERTY_COLUMNS} FROM property
             WHERE is_available = 1 AND {predicate}
             ORDER BY CAST(price AS REAL) {order}
             LIMIT ?"
        );
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&sql)
            .bind(low)
            .bind(high)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_property).collect::<Result<Vec<_>, _>>()
    }
}

fn decimal_to_f64(value: &Decimal) -> Result<f64, RepositoryError> {
    value
        .to_f64()
        .ok_or_else(|| RepositoryError::Decode(format!("price `{value}` is out of range")))
}

fn row_to_property(row: &sqlx::sqlite::SqliteRow) -> Result<Property, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let property_identifier: String =
        row.try_get("property_identifier").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: String =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price_str: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let location: String =
        row.try_get("location").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let bedrooms: i32 =
        row.try_get("bedrooms").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let bathrooms: i32 =
        row.try_get("bathrooms").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_available: bool =
        row.try_get("is_available").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let image: String = row.try_get("image").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let image_urls_json: Option<String> =
        row.try_get("image_urls_json").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let price = Decimal::from_str(&price_str)
        .map_err(|e| RepositoryError::Decode(format!("invalid price `{price_str}`: {e}")))?;
    let image_urls = image_urls_json
        .map(|raw| {
            serde_json::from_str::<Vec<String>>(&raw)
                .map_err(|e| RepositoryError::Decode(format!("invalid image_urls: {e}")))
        })
        .transpose()?;

    Ok(Property {
        id: PropertyId(id),
        property_identifier: PropertyIdentifier(property_identifier),
        name,
        description,
        price,
        location,
        bedrooms,
        bathrooms,
        is_available,
        image,
        image_urls,
        created_at: decode_timestamp(&created_at_str)?,
    })
}

fn encode_image_urls(image_urls: &Option<Vec<String>>) -> Result<Option<String>, RepositoryError> {
    image_urls
        .as_ref()
        .map(|urls| {
            serde_json::to_string(urls)
                .map_err(|e| RepositoryError::Decode(format!("encode image_urls: {e}")))
        })
        .transpose()
}

#[async_trait::async_trait]
impl PropertyRepository for SqlPropertyRepository {
    async fn find_by_id(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        let sql = format!("SELECT {PROPERTY_COLUMNS} FROM property WHERE id = ?");
        let row = sqlx::query(&sql).bind(&id.0).fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => Ok(Some(row_to_property(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Property>, RepositoryError> {
        let sql = format!("SELECT {PROPERTY_COLUMNS} FROM property WHERE property_identifier = ?");
        let row = sqlx::query(&sql).bind(identifier).fetch_optional(&self.pool).await?;

        match row {
            Some(ref r) => Ok(Some(row_to_property(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, property: Property) -> Result<(), RepositoryError> {
        let image_urls_json = encode_image_urls(&property.image_urls)?;

        let result = sqlx::query(
            "INSERT INTO property (id, property_identifier, name, description, price, location,
                                   bedrooms, bathrooms, is_available, image, image_urls_json,
                                   created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&property.id.0)
        .bind(property.property_identifier.as_str())
        .bind(&property.name)
        .bind(&property.description)
        .bind(property.price.to_string())
        .bind(&property.location)
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.is_available)
        .bind(&property.image)
        .bind(image_urls_json)
        .bind(encode_timestamp(&property.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) if is_unique_violation(&error) => Err(RepositoryError::Conflict(format!(
                "property identifier `{}` is already assigned",
                property.property_identifier
            ))),
            Err(error) => Err(error.into()),
        }
    }

    async fn save(&self, property: Property) -> Result<(), RepositoryError> {
        let image_urls_json = encode_image_urls(&property.image_urls)?;

        let result = sqlx::query(
            "UPDATE property SET
                 name = ?,
                 description = ?,
                 price = ?,
                 location = ?,
                 bedrooms = ?,
                 bathrooms = ?,
                 is_available = ?,
                 image = ?,
                 image_urls_json = ?
             WHERE id = ?",
        )
        .bind(&property.name)
        .bind(&property.description)
        .bind(property.price.to_string())
        .bind(&property.location)
        .bind(property.bedrooms)
        .bind(property.bathrooms)
        .bind(property.is_available)
        .bind(&property.image)
        .bind(image_urls_json)
        .bind(&property.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return self.insert(property).await;
        }

        Ok(())
    }

    async fn list_recent(&self) -> Result<Vec<Property>, RepositoryError> {
        let sql = format!("SELECT {PROPERTY_COLUMNS} FROM property ORDER BY created_at DESC");
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_property).collect::<Result<Vec<_>, _>>()
    }

    async fn recommend(
        &self,
        band: &PriceBand,
        per_side: u32,
    ) -> Result<Vec<Property>, RepositoryError> {
        let lower = decimal_to_f64(&band.lower)?;
        let budget = decimal_to_f64(&band.budget)?;
        let upper = decimal_to_f64(&band.upper)?;

        let mut below = self
            .fetch_band_side(
                "CAST(price AS REAL) >= ? AND CAST(price AS REAL) < ?",
                "DESC",
                lower,
                budget,
                per_side,
            )
            .await?;
        let above = self
            .fetch_band_side(
                "CAST(price AS REAL) > ? AND CAST(price AS REAL) <= ?",
                "ASC",
                budget,
                upper,
                per_side,
            )
            .await?;

        below.extend(above);
        Ok(below)
    }
}
