//! Turn handling for inbound customer messages.
//!
//! A turn resolves the customer, picks an intent and runs exactly one
//! handler. Every step runs in order; nothing inside a turn is concurrent.

pub mod replies;

use std::sync::Arc;

use regex::Regex;
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use intake_core::config::{BusinessConfig, DialogueConfig};
use intake_core::domain::customer::{PREFERENCE_BEDROOMS, PREFERENCE_LOCATION};
use intake_core::money::parse_amount;
use intake_core::{Customer, Interaction, InteractionKind, PriceBand, PropertyId};
use intake_db::repositories::{
    CustomerRepository, InteractionRepository, PropertyRepository, RepositoryError,
};
use intake_whatsapp::{InboundMessage, MessageSender};

use crate::classifier::{Intent, IntentClassifier};
use crate::extraction::DetailExtractor;
use crate::sentiment::{Sentiment, SentimentExtractor};

pub const RECOMMENDATIONS_PER_SIDE: u32 = 3;
const UNKNOWN_SENTIMENT: &str = "unknown";

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("storage failure during turn: {0}")]
    Storage(#[from] RepositoryError),
    #[error("message pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handler {
    PropertyInquiry,
    BudgetSharing,
    PostInspectionFeedback,
    PaymentMethod,
    GeneralQuery,
}

impl Handler {
    pub fn for_intent(intent: &Intent) -> Self {
        match intent {
            Intent::PropertyInquiry => Self::PropertyInquiry,
            Intent::BudgetSharing => Self::BudgetSharing,
            Intent::PostInspectionFeedback => Self::PostInspectionFeedback,
            Intent::PaymentMethod => Self::PaymentMethod,
            Intent::PropertyRecommendation | Intent::GeneralQuery | Intent::Unrecognized(_) => {
                Self::GeneralQuery
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PropertyInquiry => "property_inquiry",
            Self::BudgetSharing => "budget_sharing",
            Self::PostInspectionFeedback => "post_inspection_feedback",
            Self::PaymentMethod => "payment_method",
            Self::GeneralQuery => "general_query",
        }
    }
}

/// What a turn did, for logging and tests. The reply has already been
/// handed to the sender when this is returned.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub intent: Intent,
    pub handler: Handler,
    pub reply: String,
    pub delivered: bool,
}

#[derive(Clone)]
pub struct Stores {
    pub customers: Arc<dyn CustomerRepository>,
    pub properties: Arc<dyn PropertyRepository>,
    pub interactions: Arc<dyn InteractionRepository>,
}

pub struct DialogueRouter {
    stores: Stores,
    classifier: IntentClassifier,
    extractor: DetailExtractor,
    sentiment: SentimentExtractor,
    sender: Arc<dyn MessageSender>,
    business: BusinessConfig,
    settings: DialogueConfig,
    patterns: TextPatterns,
}

impl DialogueRouter {
    pub fn new(
        stores: Stores,
        classifier: IntentClassifier,
        extractor: DetailExtractor,
        sentiment: SentimentExtractor,
        sender: Arc<dyn MessageSender>,
        business: BusinessConfig,
        settings: DialogueConfig,
    ) -> Result<Self, DialogueError> {
        Ok(Self {
            stores,
            classifier,
            extractor,
            sentiment,
            sender,
            business,
            settings,
            patterns: TextPatterns::new()?,
        })
    }

    pub async fn route(
        &self,
        message: &InboundMessage,
        correlation_id: &str,
    ) -> Result<TurnOutcome, DialogueError> {
        let mut customer = self.resolve_customer(&message.sender).await?;
        let text = message.text_or_empty();

        let intent = if message.has_image && !message.has_text() {
            Intent::PropertyInquiry
        } else {
            match self.classifier.classify(text).await {
                Ok(intent) => intent,
                Err(error) => {
                    warn!(
                        event_name = "dialogue.classify.failed",
                        correlation_id = %correlation_id,
                        customer_phone = %customer.phone_number,
                        error = %error,
                        "intent classification failed; treating as general query"
                    );
                    Intent::GeneralQuery
                }
            }
        };
        let handler = Handler::for_intent(&intent);

        info!(
            event_name = "dialogue.turn.routed",
            correlation_id = %correlation_id,
            customer_phone = %customer.phone_number,
            intent = %intent,
            handler = handler.as_str(),
            "routing inbound message"
        );

        let reply = match handler {
            Handler::PropertyInquiry => {
                self.property_inquiry(&mut customer, text, message, correlation_id).await?
            }
            Handler::BudgetSharing => self.budget_sharing(&mut customer, text).await?,
            Handler::PostInspectionFeedback => {
                self.post_inspection(&customer, text, correlation_id).await?
            }
            Handler::PaymentMethod => self.payment_method(&customer, text).await?,
            Handler::GeneralQuery => self.general_query(&customer, text).await?,
        };

        let delivered = match self.sender.send_text(&customer.phone_number, &reply).await {
            Ok(()) => true,
            Err(error) => {
                warn!(
                    event_name = "dialogue.reply.failed",
                    correlation_id = %correlation_id,
                    customer_phone = %customer.phone_number,
                    error = %error,
                    "reply could not be delivered"
                );
                false
            }
        };

        Ok(TurnOutcome { intent, handler, reply, delivered })
    }

    async fn resolve_customer(&self, phone_number: &str) -> Result<Customer, DialogueError> {
        if let Some(customer) = self.stores.customers.find_by_phone(phone_number).await? {
            return Ok(customer);
        }
        let customer = Customer::new(phone_number);
        match self.stores.customers.save(customer.clone()).await {
            Ok(()) => {}
            // Another turn for the same sender created the row first.
            Err(RepositoryError::Conflict(_)) => {
                if let Some(existing) = self.stores.customers.find_by_phone(phone_number).await? {
                    debug!(
                        event_name = "dialogue.customer.concurrent_create",
                        customer_phone = %phone_number,
                        "customer created by a concurrent turn"
                    );
                    return Ok(existing);
                }
                return Err(RepositoryError::Conflict(format!(
                    "phone number `{phone_number}` conflicted but no customer was found"
                ))
                .into());
            }
            Err(error) => return Err(error.into()),
        }
        info!(
            event_name = "dialogue.customer.created",
            customer_phone = %phone_number,
            "first contact from customer"
        );
        Ok(customer)
    }

    async fn property_inquiry(
        &self,
        customer: &mut Customer,
        text: &str,
        message: &InboundMessage,
        correlation_id: &str,
    ) -> Result<String, DialogueError> {
        if message.has_image && !text.is_empty() {
            if let Some(candidate) = self.patterns.caption_identifier(text) {
                debug!(
                    event_name = "dialogue.inquiry.caption_identifier",
                    correlation_id = %correlation_id,
                    candidate = %candidate,
                    "identifier mentioned alongside image"
                );
            }
        }

        let mut property_identifier = None;
        if !text.is_empty() {
            match self.extractor.extract(text).await {
                Ok(details) => {
                    debug!(
                        event_name = "dialogue.inquiry.extracted",
                        correlation_id = %correlation_id,
                        details = ?details,
                        "inquiry details extracted"
                    );
                    let mut changed = false;
                    if let Some(budget) = details.budget {
                        customer.budget = Some(budget);
                        changed = true;
                    }
                    if let Some(location) = details.location {
                        customer.merge_preference(PREFERENCE_LOCATION, json!(location));
                        changed = true;
                    }
                    if let Some(bedrooms) = details.bedrooms {
                        customer.merge_preference(PREFERENCE_BEDROOMS, json!(bedrooms));
                        changed = true;
                    }
                    if changed {
                        self.stores.customers.save(customer.clone()).await?;
                    }
                    property_identifier = details.property_identifier;
                }
                Err(error) => warn!(
                    event_name = "dialogue.inquiry.extraction_failed",
                    correlation_id = %correlation_id,
                    customer_phone = %customer.phone_number,
                    error = %error,
                    "inquiry details could not be extracted"
                ),
            }
        }

        let property = match property_identifier {
            Some(identifier) => match self.stores.properties.find_by_identifier(&identifier).await {
                Ok(found) => found,
                Err(error) => {
                    warn!(
                        event_name = "dialogue.inquiry.lookup_failed",
                        correlation_id = %correlation_id,
                        property_identifier = %identifier,
                        error = %error,
                        "property lookup failed"
                    );
                    None
                }
            },
            None => None,
        };

        let notes = (!text.is_empty()).then(|| text.to_string());
        self.stores
            .interactions
            .append(Interaction::record(
                customer.id.clone(),
                property.as_ref().map(|p| p.id.clone()),
                InteractionKind::Inquiry,
                notes,
            ))
            .await?;

        Ok(match property {
            Some(property) if property.is_available => {
                replies::inquiry_available(&property, &self.business)
            }
            Some(property) => replies::inquiry_unavailable(&property),
            None => replies::INQUIRY_WITHOUT_PROPERTY.to_string(),
        })
    }

    async fn budget_sharing(
        &self,
        customer: &mut Customer,
        text: &str,
    ) -> Result<String, DialogueError> {
        let Some(token) = self.patterns.budget_token(text) else {
            return Ok(replies::BUDGET_MISSING.to_string());
        };
        let Some((budget, band)) = parse_budget(token, self.settings.apply_budget_suffix)
            .and_then(|budget| PriceBand::around(budget).map(|band| (budget, band)))
        else {
            return Ok(replies::BUDGET_UNREADABLE.to_string());
        };

        customer.budget = Some(budget);
        self.stores.customers.save(customer.clone()).await?;

        if self.settings.record_budget_interactions {
            self.stores
                .interactions
                .append(Interaction::record(
                    customer.id.clone(),
                    None,
                    InteractionKind::BudgetSharing,
                    Some(text.to_string()),
                ))
                .await?;
        }

        let matches = self
            .stores
            .properties
            .recommend(&band, RECOMMENDATIONS_PER_SIDE)
            .await?;

        info!(
            event_name = "dialogue.budget.recommended",
            customer_phone = %customer.phone_number,
            budget = %budget,
            matches = matches.len(),
            "budget recorded"
        );

        Ok(if matches.is_empty() {
            replies::budget_without_matches(&self.business)
        } else {
            replies::budget_recommendations(&matches, &self.business)
        })
    }

    async fn post_inspection(
        &self,
        customer: &Customer,
        text: &str,
        correlation_id: &str,
    ) -> Result<String, DialogueError> {
        let sentiment = match self.sentiment.extract(text).await {
            Ok(sentiment) => sentiment,
            Err(error) => {
                warn!(
                    event_name = "dialogue.feedback.sentiment_failed",
                    correlation_id = %correlation_id,
                    customer_phone = %customer.phone_number,
                    error = %error,
                    "sentiment could not be extracted"
                );
                Sentiment::from_raw(UNKNOWN_SENTIMENT)
            }
        };

        let property_id = self.context_property(customer, InteractionKind::Inquiry).await?;
        if let Some(id) = &property_id {
            if let Some(property) = self.stores.properties.find_by_id(id).await? {
                info!(
                    event_name = "dialogue.feedback.context",
                    correlation_id = %correlation_id,
                    location = %property.location,
                    sentiment = %sentiment,
                    "feedback on inspected property"
                );
            }
        }

        self.stores
            .interactions
            .append(Interaction::record(
                customer.id.clone(),
                property_id,
                InteractionKind::PostInspection,
                Some(replies::feedback_notes(text, sentiment.as_str())),
            ))
            .await?;

        Ok(if sentiment.is_positive() {
            replies::FEEDBACK_POSITIVE.to_string()
        } else {
            replies::FEEDBACK_NEGATIVE.to_string()
        })
    }

    async fn payment_method(&self, customer: &Customer, text: &str) -> Result<String, DialogueError> {
        let property_id = self.context_property(customer, InteractionKind::PostInspection).await?;
        self.stores
            .interactions
            .append(Interaction::record(
                customer.id.clone(),
                property_id,
                InteractionKind::PaymentInfo,
                Some(replies::payment_notes(text)),
            ))
            .await?;
        Ok(replies::PAYMENT_ACKNOWLEDGED.to_string())
    }

    async fn general_query(&self, customer: &Customer, text: &str) -> Result<String, DialogueError> {
        self.stores
            .interactions
            .append(Interaction::record(
                customer.id.clone(),
                None,
                InteractionKind::GeneralQuery,
                Some(text.to_string()),
            ))
            .await?;
        Ok(replies::general(&self.business))
    }

    async fn context_property(
        &self,
        customer: &Customer,
        kind: InteractionKind,
    ) -> Result<Option<PropertyId>, DialogueError> {
        Ok(self
            .stores
            .interactions
            .latest_for_customer(&customer.id, kind)
            .await?
            .and_then(|interaction| interaction.property_id))
    }
}

/// Regexes applied to raw message text.
pub struct TextPatterns {
    budget: Regex,
    caption: Regex,
}

impl TextPatterns {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            budget: Regex::new(r"(\d[\d,.]*\s?[kKmM]?)")?,
            caption: Regex::new(r"(?i)property\s+#?(\d+)")?,
        })
    }

    /// First amount-like token, including an optional `k`/`m` suffix.
    pub fn budget_token<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.budget.find(text).map(|m| m.as_str())
    }

    pub fn caption_identifier<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.caption.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str())
    }
}

/// Parses a budget token. The suffix multiplier is only applied when asked;
/// an amount that overflows once scaled is unreadable.
pub fn parse_budget(token: &str, apply_suffix: bool) -> Option<Decimal> {
    let amount = parse_amount(token)?;
    if !apply_suffix {
        return Some(amount);
    }
    let multiplier = match token.trim_end().chars().last() {
        Some('k' | 'K') => Decimal::new(1_000, 0),
        Some('m' | 'M') => Decimal::new(1_000_000, 0),
        _ => Decimal::ONE,
    };
    amount.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{parse_budget, Handler, TextPatterns};
    use crate::classifier::Intent;

    fn patterns() -> TextPatterns {
        TextPatterns::new().expect("patterns compile")
    }

    #[test]
    fn budget_token_keeps_suffix() {
        let patterns = patterns();
        assert_eq!(patterns.budget_token("My budget is 250k"), Some("250k"));
        assert_eq!(patterns.budget_token("about 1,500,000 naira"), Some("1,500,000 "));
        assert_eq!(patterns.budget_token("no idea yet"), None);
    }

    #[test]
    fn suffix_is_ignored_unless_enabled() {
        assert_eq!(parse_budget("250k", false), Some(Decimal::new(250, 0)));
        assert_eq!(parse_budget("250k", true), Some(Decimal::new(250_000, 0)));
        assert_eq!(parse_budget("1.5M", true), Some(Decimal::new(1_500_000, 0)));
        assert_eq!(parse_budget("200000", true), Some(Decimal::new(200_000, 0)));
    }

    #[test]
    fn scaled_budget_that_overflows_is_unreadable() {
        assert_eq!(parse_budget("70000000000000000000000000m", true), None);
        assert!(parse_budget("70000000000000000000000000m", false).is_some());
    }

    #[test]
    fn malformed_token_does_not_parse() {
        let patterns = patterns();
        assert_eq!(patterns.budget_token("version 1.2.3"), Some("1.2.3"));
        assert_eq!(parse_budget("1.2.3", false), None);
    }

    #[test]
    fn caption_identifier_is_case_insensitive() {
        let patterns = patterns();
        assert_eq!(patterns.caption_identifier("Is PROPERTY #47237 free?"), Some("47237"));
        assert_eq!(patterns.caption_identifier("property 58012"), Some("58012"));
        assert_eq!(patterns.caption_identifier("this house"), None);
    }

    #[test]
    fn unmatched_intents_fall_through_to_general() {
        assert_eq!(Handler::for_intent(&Intent::PropertyRecommendation), Handler::GeneralQuery);
        assert_eq!(
            Handler::for_intent(&Intent::Unrecognized("greeting".to_string())),
            Handler::GeneralQuery
        );
        assert_eq!(Handler::for_intent(&Intent::PaymentMethod), Handler::PaymentMethod);
    }
}
