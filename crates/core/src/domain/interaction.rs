use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::CustomerId;
use crate::domain::property::PropertyId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionId(pub String);

impl InteractionId {
    pub fn generate() -> Self {
        Self(format!("INT-{}", Uuid::new_v4().simple()))
    }
}

/// Type tag stored with every dialogue turn. The string form is what lands
/// in storage and what "most recent of kind" lookups filter on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Inquiry,
    BudgetSharing,
    PostInspection,
    PaymentInfo,
    GeneralQuery,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inquiry => "inquiry",
            Self::BudgetSharing => "budget_sharing",
            Self::PostInspection => "post_inspection",
            Self::PaymentInfo => "payment_info",
            Self::GeneralQuery => "general_query",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inquiry" => Ok(Self::Inquiry),
            "budget_sharing" => Ok(Self::BudgetSharing),
            "post_inspection" => Ok(Self::PostInspection),
            "payment_info" => Ok(Self::PaymentInfo),
            "general_query" => Ok(Self::GeneralQuery),
            other => Err(DomainError::UnknownInteractionKind(other.to_string())),
        }
    }
}

/// Append-only record of one dialogue turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub customer_id: CustomerId,
    pub property_id: Option<PropertyId>,
    pub kind: InteractionKind,
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn record(
        customer_id: CustomerId,
        property_id: Option<PropertyId>,
        kind: InteractionKind,
        notes: Option<String>,
    ) -> Self {
        Self {
            id: InteractionId::generate(),
            customer_id,
            property_id,
            kind,
            notes,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::InteractionKind;
    use crate::errors::DomainError;

    #[test]
    fn kind_strings_parse_back() {
        for kind in [
            InteractionKind::Inquiry,
            InteractionKind::BudgetSharing,
            InteractionKind::PostInspection,
            InteractionKind::PaymentInfo,
            InteractionKind::GeneralQuery,
        ] {
            assert_eq!(kind.as_str().parse::<InteractionKind>(), Ok(kind));
        }
    }

    #[test]
    fn misspelled_tag_is_rejected() {
        assert_eq!(
            "genaral_query".parse::<InteractionKind>(),
            Err(DomainError::UnknownInteractionKind("genaral_query".to_string()))
        );
    }
}
