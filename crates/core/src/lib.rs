pub mod config;
pub mod domain;
pub mod errors;
pub mod money;

pub use config::{AppConfig, ConfigError, LoadOptions};
pub use domain::customer::{Customer, CustomerId, Preferences};
pub use domain::interaction::{Interaction, InteractionId, InteractionKind};
pub use domain::property::{NewProperty, PriceBand, Property, PropertyId, PropertyIdentifier};
pub use errors::{ApplicationError, DomainError, InterfaceError};
