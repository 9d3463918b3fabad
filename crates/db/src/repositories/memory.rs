use std::collections::HashMap;

use tokio::sync::RwLock;

use intake_core::domain::customer::{Customer, CustomerId};
use intake_core::domain::interaction::{Interaction, InteractionKind};
use intake_core::domain::property::{PriceBand, Property, PropertyId};

use super::{CustomerRepository, InteractionRepository, PropertyRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<String, Customer>>,
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers.get(phone_number).cloned())
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        let mut customers = self.customers.write().await;
        if let Some(existing) = customers.get(&customer.phone_number) {
            if existing.id != customer.id {
                return Err(RepositoryError::Conflict(format!(
                    "phone number `{}` belongs to another customer",
                    customer.phone_number
                )));
            }
        }
        customers.insert(customer.phone_number.clone(), customer);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPropertyRepository {
    properties: RwLock<HashMap<String, Property>>,
}

#[async_trait::async_trait]
impl PropertyRepository for InMemoryPropertyRepository {
    async fn find_by_id(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError> {
        let properties = self.properties.read().await;
        Ok(properties.get(&id.0).cloned())
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Property>, RepositoryError> {
        let properties = self.properties.read().await;
        Ok(properties.values().find(|p| p.property_identifier.as_str() == identifier).cloned())
    }

    async fn insert(&self, property: Property) -> Result<(), RepositoryError> {
        let mut properties = self.properties.write().await;
        if properties.values().any(|p| p.property_identifier == property.property_identifier) {
            return Err(RepositoryError::Conflict(format!(
                "property identifier `{}` is already assigned",
                property.property_identifier
            )));
        }
        properties.insert(property.id.0.clone(), property);
        Ok(())
    }

    async fn save(&self, mut property: Property) -> Result<(), RepositoryError> {
        {
            let mut properties = self.properties.write().await;
            if let Some(existing) = properties.get(&property.id.0) {
                property.property_identifier = existing.property_identifier.clone();
                property.created_at = existing.created_at;
                properties.insert(property.id.0.clone(), property);
                return Ok(());
            }
        }
        self.insert(property).await
    }

    async fn list_recent(&self) -> Result<Vec<Property>, RepositoryError> {
        let properties = self.properties.read().await;
        let mut listed: Vec<Property> = properties.values().cloned().collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn recommend(
        &self,
        band: &PriceBand,
        per_side: u32,
    ) -> Result<Vec<Property>, RepositoryError> {
        let properties = self.properties.read().await;
        let limit = per_side as usize;

        let mut below: Vec<Property> = properties
            .values()
            .filter(|p| p.is_available && band.contains_below(&p.price))
            .cloned()
            .collect();
        below.sort_by(|a, b| b.price.cmp(&a.price));
        below.truncate(limit);

        let mut above: Vec<Property> = properties
            .values()
            .filter(|p| p.is_available && band.contains_above(&p.price))
            .cloned()
            .collect();
        above.sort_by(|a, b| a.price.cmp(&b.price));
        above.truncate(limit);

        below.extend(above);
        Ok(below)
    }
}

/// Append-only log; insertion order breaks timestamp ties.
#[derive(Default)]
pub struct InMemoryInteractionRepository {
    interactions: RwLock<Vec<Interaction>>,
}

#[async_trait::async_trait]
impl InteractionRepository for InMemoryInteractionRepository {
    async fn append(&self, interaction: Interaction) -> Result<(), RepositoryError> {
        let mut interactions = self.interactions.write().await;
        interactions.push(interaction);
        Ok(())
    }

    async fn latest_for_customer(
        &self,
        customer_id: &CustomerId,
        kind: InteractionKind,
    ) -> Result<Option<Interaction>, RepositoryError> {
        let interactions = self.interactions.read().await;
        let latest = interactions
            .iter()
            .enumerate()
            .filter(|(_, i)| &i.customer_id == customer_id && i.kind == kind)
            .max_by(|(ia, a), (ib, b)| a.timestamp.cmp(&b.timestamp).then(ia.cmp(ib)))
            .map(|(_, i)| i.clone());
        Ok(latest)
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Vec<Interaction>, RepositoryError> {
        let interactions = self.interactions.read().await;
        let mut history: Vec<Interaction> =
            interactions.iter().filter(|i| &i.customer_id == customer_id).cloned().collect();
        history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(history)
    }
}
