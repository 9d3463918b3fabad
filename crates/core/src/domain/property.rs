use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PROPERTY_IMAGE: &str = "property_images/default.jpg";

/// Internal storage key. Never shown to customers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub String);

impl PropertyId {
    pub fn generate() -> Self {
        Self(format!("PROP-{}", Uuid::new_v4().simple()))
    }
}

/// Human-facing listing number customers quote back in messages.
///
/// Assigned once when the listing is first stored and never rewritten.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyIdentifier(pub String);

impl PropertyIdentifier {
    pub const MIN: u32 = 10_000;
    pub const MAX: u32 = 99_999;

    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(Self::MIN..=Self::MAX).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub property_identifier: PropertyIdentifier,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub is_available: bool,
    pub image: String,
    pub image_urls: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Listing fields supplied by an operator before storage assigns keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub location: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_urls: Option<Vec<String>>,
    #[serde(default)]
    pub property_identifier: Option<String>,
}

/// The ±20% price window used for budget-based recommendations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceBand {
    pub budget: Decimal,
    pub lower: Decimal,
    pub upper: Decimal,
}

impl PriceBand {
    /// `None` when the band edges overflow `Decimal`.
    pub fn around(budget: Decimal) -> Option<Self> {
        Some(Self {
            budget,
            lower: budget.checked_mul(Decimal::new(8, 1))?,
            upper: budget.checked_mul(Decimal::new(12, 1))?,
        })
    }

    /// `[lower, budget)`
    pub fn contains_below(&self, price: &Decimal) -> bool {
        *price >= self.lower && *price < self.budget
    }

    /// `(budget, upper]`
    pub fn contains_above(&self, price: &Decimal) -> bool {
        *price > self.budget && *price <= self.upper
    }
}

fn default_available() -> bool {
    true
}

impl NewProperty {
    pub fn into_property<R: Rng + ?Sized>(self, rng: &mut R) -> Property {
        let property_identifier = self
            .property_identifier
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PropertyIdentifier)
            .unwrap_or_else(|| PropertyIdentifier::generate(rng));

        Property {
            id: PropertyId::generate(),
            property_identifier,
            name: self.name,
            description: self.description,
            price: self.price,
            location: self.location,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            is_available: self.is_available,
            image: self.image.unwrap_or_else(|| DEFAULT_PROPERTY_IMAGE.to_string()),
            image_urls: self.image_urls,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rand::{rngs::StdRng, SeedableRng};
    use rust_decimal::Decimal;

    use super::{NewProperty, PriceBand, PropertyIdentifier, DEFAULT_PROPERTY_IMAGE};

    fn listing(identifier: Option<&str>) -> NewProperty {
        NewProperty {
            name: "Palm Court Duplex".to_string(),
            description: "Four bedroom duplex with BQ".to_string(),
            price: Decimal::new(185_000_00, 2),
            location: "Lekki Phase 1".to_string(),
            bedrooms: 4,
            bathrooms: 5,
            is_available: true,
            image: None,
            image_urls: None,
            property_identifier: identifier.map(str::to_string),
        }
    }

    #[test]
    fn generated_identifier_is_five_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let identifier = PropertyIdentifier::generate(&mut rng);
            assert_eq!(identifier.as_str().len(), 5);
            let value: u32 = identifier.as_str().parse().expect("numeric identifier");
            assert!((PropertyIdentifier::MIN..=PropertyIdentifier::MAX).contains(&value));
        }
    }

    #[test]
    fn explicit_identifier_is_kept() {
        let mut rng = StdRng::seed_from_u64(1);
        let property = listing(Some("47237")).into_property(&mut rng);

        assert_eq!(property.property_identifier.as_str(), "47237");
        assert_eq!(property.image, DEFAULT_PROPERTY_IMAGE);
    }

    #[test]
    fn blank_identifier_is_replaced_with_generated_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let property = listing(Some("  ")).into_property(&mut rng);

        assert_eq!(property.property_identifier.as_str().len(), 5);
    }

    #[test]
    fn price_band_near_decimal_max_is_rejected() {
        assert!(PriceBand::around(Decimal::MAX).is_none());
        let budget = Decimal::from_str("70000000000000000000000000000").expect("decimal");
        assert!(PriceBand::around(budget).is_none());
    }

    #[test]
    fn price_band_is_twenty_percent_either_side() {
        let band = PriceBand::around(Decimal::new(250_000, 0)).expect("band");

        assert_eq!(band.lower, Decimal::new(200_000, 0));
        assert_eq!(band.upper, Decimal::new(300_000, 0));
        assert!(band.contains_below(&Decimal::new(200_000, 0)));
        assert!(!band.contains_below(&Decimal::new(250_000, 0)));
        assert!(!band.contains_above(&Decimal::new(250_000, 0)));
        assert!(band.contains_above(&Decimal::new(300_000, 0)));
        assert!(!band.contains_above(&Decimal::new(300_001, 0)));
    }
}
