use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn generate() -> Self {
        Self(format!("CUS-{}", Uuid::new_v4().simple()))
    }
}

/// Free-form preference map keyed by the extraction field name
/// (`"Location"`, `"Bedrooms"`, ...).
pub type Preferences = BTreeMap<String, Value>;

pub const PREFERENCE_LOCATION: &str = "Location";
pub const PREFERENCE_BEDROOMS: &str = "Bedrooms";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub phone_number: String,
    pub name: Option<String>,
    pub budget: Option<Decimal>,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// A first-contact record: no name, no budget, empty preferences.
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            id: CustomerId::generate(),
            phone_number: phone_number.into(),
            name: None,
            budget: None,
            preferences: Preferences::new(),
            created_at: Utc::now(),
        }
    }

    /// Inserts or replaces a single preference, leaving other keys intact.
    pub fn merge_preference(&mut self, key: &str, value: Value) {
        self.preferences.insert(key.to_string(), value);
    }
}
